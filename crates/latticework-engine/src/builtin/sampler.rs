//! Deterministic seed-point sampling

use crate::collaborators::PointSampler;
use glam::UVec3;
use latticework_core::VoxelField;
use rayon::prelude::*;

/// Accepts each cell of the sampled region with a fixed probability
///
/// The region is every cell with value `<= -threshold`: on an SDF that is
/// everything at least `threshold` voxels inside the surface, on a height map
/// everything at least that deep. Acceptance is a hash of the cell index and
/// the seed, so the same field always yields the same points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashSampler {
    /// Fraction of region cells that become seeds, in `[0, 1]`
    pub rate: f64,
    pub seed: u32,
}

impl HashSampler {
    pub fn new(rate: f64, seed: u32) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            seed,
        }
    }

    fn accepts(&self, idx: usize) -> bool {
        let h = mix(idx as u64 ^ (u64::from(self.seed) << 32));
        // Top 53 bits as a uniform float in [0, 1)
        ((h >> 11) as f64 / (1u64 << 53) as f64) < self.rate
    }
}

impl Default for HashSampler {
    fn default() -> Self {
        Self::new(0.002, 0)
    }
}

impl PointSampler for HashSampler {
    fn sample(&self, field: &VoxelField, threshold: f32) -> Vec<UVec3> {
        field
            .data()
            .par_iter()
            .enumerate()
            .filter(|&(idx, &v)| v <= -threshold && self.accepts(idx))
            .map(|(idx, _)| field.position(idx))
            .collect()
    }
}

// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
