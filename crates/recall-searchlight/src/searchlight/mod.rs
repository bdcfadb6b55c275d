//! Searchlight traversal of a masked brain volume.
//!
//! A searchlight evaluates a statistic independently inside a small
//! neighborhood centered on every brain voxel and assembles the scalars into
//! a full-volume map.
//!
//! The analysis talks to the traversal only through [`SearchlightEngine`]:
//!
//! ```text
//! distribute(volumes, mask) ──► broadcast(value) ──► run_searchlight(voxel_fn)
//!                                                          │
//!                                  partition_blocks ◄──────┤
//!                                  Neighborhood per center ┘
//! ```
//!
//! [`Searchlight`] is the in-process implementation: the center grid is cut
//! into blocks and the blocks are evaluated on a rayon pool.

mod block;
mod engine;

pub use block::{partition_blocks, Block};
pub use engine::{Searchlight, SearchlightParams};

use ndarray::{Array3, ArrayView4};

use crate::error::EngineError;

/// A searchlight neighborhood handed to the voxel function.
///
/// Every view spans the full `(2r+1)^3` bounding cube around `center`, all
/// time frames included. `mask` has the same spatial extent and is `true`
/// only for voxels that are both in the brain and inside the configured
/// shape.
#[derive(Debug)]
pub struct Neighborhood<'a> {
    /// Center voxel in full-volume coordinates.
    pub center: [usize; 3],
    /// One view per distributed volume, `[2r+1, 2r+1, 2r+1, T]`.
    pub data: Vec<ArrayView4<'a, f32>>,
    /// Active voxels of the neighborhood.
    pub mask: Array3<bool>,
    /// Searchlight radius.
    pub radius: usize,
}

impl Neighborhood<'_> {
    /// Number of active voxels.
    pub fn active_voxels(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

/// Distribute / broadcast / run contract of a searchlight engine.
///
/// Implementations may evaluate neighborhoods concurrently, so the voxel
/// function and the broadcast value must be shareable across threads.
pub trait SearchlightEngine {
    /// Value replicated to every neighborhood evaluation.
    type Broadcast: Send + Sync;

    /// Hand the engine the 4-D volumes and the brain mask they share.
    fn distribute(&mut self, volumes: Vec<ndarray::Array4<f32>>, mask: Array3<bool>) -> Result<(), EngineError>;

    /// Replicate `value` to every evaluation.
    fn broadcast(&mut self, value: Self::Broadcast);

    /// Evaluate `voxel_fn` at every searchlight center.
    ///
    /// The returned volume has the mask's shape; voxels that were not
    /// evaluated hold `NaN`.
    fn run_searchlight<F>(&self, voxel_fn: F) -> Result<Array3<f64>, EngineError>
    where
        F: Fn(&Neighborhood<'_>, &Self::Broadcast) -> f64 + Send + Sync;
}
