//! In-process searchlight engine backed by a rayon thread pool.

use ndarray::{s, Array3, Array4, Axis};
use rayon::prelude::*;
use tracing::{debug, info};

use super::block::{partition_blocks, Block};
use super::{Neighborhood, SearchlightEngine};
use crate::config::{SearchlightConfig, SearchlightShape};
use crate::error::EngineError;

/// Traversal parameters of a [`Searchlight`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchlightParams {
    /// Neighborhood radius in voxels.
    pub radius: usize,
    /// Neighborhood shape.
    pub shape: SearchlightShape,
    /// Edge length of a work block, in centers.
    pub max_blk_edge: usize,
    /// Centers whose active fraction does not exceed this are skipped
    /// (ignored when `0.0`).
    pub min_active_voxels_proportion: f64,
    /// Pool size; `0` uses rayon's default.
    pub num_threads: usize,
}

impl SearchlightParams {
    /// Parameters with the given radius and defaults elsewhere.
    pub fn with_radius(radius: usize) -> Self {
        SearchlightParams { radius, ..Self::from(&SearchlightConfig::default()) }
    }
}

impl From<&SearchlightConfig> for SearchlightParams {
    fn from(cfg: &SearchlightConfig) -> Self {
        SearchlightParams {
            radius: cfg.radius,
            shape: cfg.shape,
            max_blk_edge: cfg.max_blk_edge,
            min_active_voxels_proportion: cfg.min_active_voxels_proportion,
            num_threads: cfg.num_threads,
        }
    }
}

/// Searchlight engine evaluating blocks of centers in parallel.
///
/// `B` is the broadcast type shared read-only by all evaluations.
#[derive(Debug)]
pub struct Searchlight<B> {
    params: SearchlightParams,
    shape_mask: Array3<bool>,
    volumes: Vec<Array4<f32>>,
    mask: Option<Array3<bool>>,
    bcast: Option<B>,
}

impl<B> Searchlight<B> {
    /// Create an engine with no data distributed yet.
    pub fn new(params: SearchlightParams) -> Self {
        let d = 2 * params.radius + 1;
        let r = params.radius as isize;
        let shape = params.shape;
        let radius = params.radius;
        let shape_mask = Array3::from_shape_fn((d, d, d), |(i, j, k)| {
            shape.contains(i as isize - r, j as isize - r, k as isize - r, radius)
        });
        Searchlight { params, shape_mask, volumes: Vec::new(), mask: None, bcast: None }
    }

    /// Traversal parameters.
    pub fn params(&self) -> &SearchlightParams {
        &self.params
    }

    /// Shape mask of the bounding cube, `[2r+1; 3]`.
    pub fn shape_mask(&self) -> &Array3<bool> {
        &self.shape_mask
    }

    fn evaluate_block<F>(&self, block: &Block, mask: &Array3<bool>, bcast: &B, voxel_fn: &F) -> Vec<([usize; 3], f64)>
    where
        F: Fn(&Neighborhood<'_>, &B) -> f64,
    {
        let r = self.params.radius;
        let d = 2 * r + 1;
        let cube_size = (d * d * d) as f64;
        let min_prop = self.params.min_active_voxels_proportion;

        let mut out = Vec::new();
        for center in block.centers() {
            if !mask[center] {
                continue;
            }
            let [x, y, z] = center;
            let (x0, y0, z0) = (x - r, y - r, z - r);

            let mut local_mask = mask.slice(s![x0..x0 + d, y0..y0 + d, z0..z0 + d]).to_owned();
            local_mask.zip_mut_with(&self.shape_mask, |m, &inside| *m = *m && inside);

            if min_prop > 0.0 {
                let active = local_mask.iter().filter(|&&m| m).count() as f64;
                if active / cube_size <= min_prop {
                    continue;
                }
            }

            let data = self
                .volumes
                .iter()
                .map(|v| v.slice(s![x0..x0 + d, y0..y0 + d, z0..z0 + d, ..]))
                .collect();
            let nbhd = Neighborhood { center, data, mask: local_mask, radius: r };
            out.push((center, voxel_fn(&nbhd, bcast)));
        }
        out
    }
}

impl<B: Send + Sync> SearchlightEngine for Searchlight<B> {
    type Broadcast = B;

    fn distribute(&mut self, volumes: Vec<Array4<f32>>, mask: Array3<bool>) -> Result<(), EngineError> {
        if volumes.is_empty() {
            return Err(EngineError::NoVolumes);
        }
        let (mx, my, mz) = mask.dim();
        let expected = [mx, my, mz];
        for (index, v) in volumes.iter().enumerate() {
            let actual = spatial_shape(v);
            if actual != expected {
                return Err(EngineError::VolumeShapeMismatch { index, expected, actual });
            }
        }
        debug!(volumes = volumes.len(), mask_voxels = mask.iter().filter(|&&m| m).count(), "distributed");
        self.volumes = volumes;
        self.mask = Some(mask);
        Ok(())
    }

    fn broadcast(&mut self, value: B) {
        self.bcast = Some(value);
    }

    fn run_searchlight<F>(&self, voxel_fn: F) -> Result<Array3<f64>, EngineError>
    where
        F: Fn(&Neighborhood<'_>, &B) -> f64 + Send + Sync,
    {
        let mask = self.mask.as_ref().ok_or(EngineError::NotDistributed)?;
        let bcast = self.bcast.as_ref().ok_or(EngineError::NotBroadcast)?;

        let blocks = partition_blocks(mask, self.params.radius, self.params.max_blk_edge);
        info!(
            blocks = blocks.len(),
            radius = self.params.radius,
            shape = ?self.params.shape,
            "running searchlight"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.num_threads)
            .build()
            .map_err(|e| EngineError::ThreadPool(e.to_string()))?;

        let evaluated: Vec<Vec<([usize; 3], f64)>> = pool.install(|| {
            blocks
                .par_iter()
                .map(|block| self.evaluate_block(block, mask, bcast, &voxel_fn))
                .collect()
        });

        let mut result = Array3::from_elem(mask.raw_dim(), f64::NAN);
        let mut n_centers = 0usize;
        for (center, value) in evaluated.into_iter().flatten() {
            result[center] = value;
            n_centers += 1;
        }
        debug!(centers = n_centers, "searchlight finished");
        Ok(result)
    }
}

/// Spatial extent of a 4-D volume.
pub(crate) fn spatial_shape(v: &Array4<f32>) -> [usize; 3] {
    [v.len_of(Axis(0)), v.len_of(Axis(1)), v.len_of(Axis(2))]
}
