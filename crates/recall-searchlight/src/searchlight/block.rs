//! Partitioning of the searchlight center grid into work blocks.

use ndarray::{s, Array3};

/// A box of searchlight centers, in full-volume coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// First center of the block.
    pub origin: [usize; 3],
    /// Number of centers along each axis.
    pub extent: [usize; 3],
}

impl Block {
    /// All centers of the block in `x`, `y`, `z` order (z fastest).
    pub fn centers(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let [ox, oy, oz] = self.origin;
        let [ex, ey, ez] = self.extent;
        (ox..ox + ex).flat_map(move |x| {
            (oy..oy + ey).flat_map(move |y| (oz..oz + ez).map(move |z| [x, y, z]))
        })
    }

    /// Number of centers in the block.
    pub fn len(&self) -> usize {
        self.extent.iter().product()
    }

    /// Whether the block holds no centers.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cut the admissible centers of `mask` into blocks of at most `max_edge`
/// centers per side.
///
/// A center is admissible when it lies at least `radius` voxels from every
/// face, so that its bounding cube fits in the volume. Blocks without any
/// in-mask center are dropped.
pub fn partition_blocks(mask: &Array3<bool>, radius: usize, max_edge: usize) -> Vec<Block> {
    let max_edge = max_edge.max(1);
    let dims = mask.dim();
    let dims = [dims.0, dims.1, dims.2];
    if dims.iter().any(|&d| d < 2 * radius + 1) {
        return Vec::new();
    }
    // Centers lie in [radius, dim - radius).
    let hi = dims.map(|d| d - radius);

    let mut blocks = Vec::new();
    for x in (radius..hi[0]).step_by(max_edge) {
        for y in (radius..hi[1]).step_by(max_edge) {
            for z in (radius..hi[2]).step_by(max_edge) {
                let extent = [
                    max_edge.min(hi[0] - x),
                    max_edge.min(hi[1] - y),
                    max_edge.min(hi[2] - z),
                ];
                let any_active = mask
                    .slice(s![x..x + extent[0], y..y + extent[1], z..z + extent[2]])
                    .iter()
                    .any(|&m| m);
                if any_active {
                    blocks.push(Block { origin: [x, y, z], extent });
                }
            }
        }
    }
    blocks
}
