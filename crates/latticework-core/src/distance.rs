//! Jump-flood distance transform
//!
//! Converts a binary-ish field (solid where `<= 0`) into a signed distance
//! field in voxel units. Every cell carries a [`JumpFloodRecord`] naming the
//! nearest seed found so far; rounds of neighbour inspection at halving step
//! sizes spread seeds across the grid in `O(log n)` launches.
//!
//! Records live in two buffers, `current` and `next`, swapped after every
//! round. A round only ever reads `current` and writes `next`.

use crate::field::cell_count;
use crate::kernel::{Kernel, stencil};
use crate::VoxelField;
use glam::{UVec3, Vec3};

/// Cell value of non-boundary solid after [`Kernel::simplify`]
pub const SIMPLIFIED_INSIDE: f32 = -0.01;
/// Cell value of empty space after [`Kernel::simplify`]
pub const SIMPLIFIED_OUTSIDE: f32 = 0.01;
/// Distance of cells no seed reaches. Kept finite for smoothing and offsets.
pub const UNSEEDED_DISTANCE: f32 = 1.0e6;

/// Nearest-seed state of one cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpFloodRecord {
    /// Coordinates of the nearest seed, infinite while none is known
    pub seed: Vec3,
    /// Distance to that seed
    pub distance: f32,
}

impl JumpFloodRecord {
    /// No seed reached yet
    pub const UNSEEDED: Self = Self {
        seed: Vec3::INFINITY,
        distance: UNSEEDED_DISTANCE,
    };

    /// A seed cell pointing at itself
    pub fn seed(p: UVec3) -> Self {
        Self {
            seed: p.as_vec3(),
            distance: 0.0,
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.seed.is_finite()
    }
}

/// Distance function used to compare candidate seeds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    #[default]
    Euclidean,
    /// Minkowski norm of order `p`
    Minkowski(f32),
}

impl Metric {
    /// Pick the metric for a norm order, using the Euclidean fast path for 2
    pub fn from_order(order: f32) -> Self {
        if (order - 2.0).abs() < f32::EPSILON {
            Metric::Euclidean
        } else {
            Metric::Minkowski(order)
        }
    }

    pub fn distance(&self, a: Vec3, b: Vec3) -> f32 {
        match *self {
            Metric::Euclidean => a.distance(b),
            Metric::Minkowski(order) => {
                let d = (a - b).abs();
                (d.x.powf(order) + d.y.powf(order) + d.z.powf(order)).powf(order.recip())
            }
        }
    }
}

/// Result of a jump-flood run: one record per cell
#[derive(Debug, Clone, PartialEq)]
pub struct JumpFloodField {
    dims: UVec3,
    records: Vec<JumpFloodRecord>,
}

impl JumpFloodField {
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn records(&self) -> &[JumpFloodRecord] {
        &self.records
    }

    pub fn get(&self, p: UVec3) -> JumpFloodRecord {
        self.records[crate::field::flat_index(self.dims, p)]
    }

    /// Nearest seed of cell `p`, if any seed exists
    pub fn nearest_seed(&self, p: UVec3) -> Option<UVec3> {
        let record = self.get(p);
        record.is_seeded().then(|| record.seed.as_uvec3())
    }

    /// Unsigned distance to the nearest seed for every cell
    pub fn distance_field(&self) -> VoxelField {
        VoxelField::from_parts(self.dims, self.records.iter().map(|r| r.distance).collect())
    }
}

/// Number of coarse rounds for a grid whose largest side is `max_dim`
pub fn round_count(max_dim: u32) -> u32 {
    let n = ((max_dim.saturating_sub(1)) as f32).log2() + 0.5;
    n.ceil().max(1.0) as u32
}

/// Step sizes of a full run: `2^(n-1) .. 1`, then the two finishing rounds
pub fn step_sizes(max_dim: u32) -> Vec<u32> {
    let n = round_count(max_dim);
    (0..n).map(|round| 1 << (n - round - 1)).chain([2, 1]).collect()
}

impl Kernel {
    /// Propagate nearest seeds from every cell with value `<= 0`
    pub fn jump_flood(&self, a: &VoxelField, metric: Metric) -> JumpFloodField {
        let dims = a.dims();
        let launch = self.launch(dims);
        let src = a.data();

        let mut current = vec![JumpFloodRecord::UNSEEDED; cell_count(dims)];
        launch.cells(&mut current, |p, idx, record| {
            if src[idx] <= 0.0 {
                *record = JumpFloodRecord::seed(p);
            }
        });
        let mut next = current.clone();

        for step in step_sizes(dims.max_element()) {
            let read = &current;
            launch.cells(&mut next, |p, idx, record| {
                let here = p.as_vec3();
                let mut best = read[idx];
                for (_, q) in stencil(p, step, dims) {
                    let candidate = read[q];
                    if !candidate.is_seeded() {
                        continue;
                    }
                    let d = metric.distance(here, candidate.seed);
                    if d < best.distance {
                        best = JumpFloodRecord {
                            seed: candidate.seed,
                            distance: d,
                        };
                    }
                }
                *record = best;
            });
            std::mem::swap(&mut current, &mut next);
        }

        JumpFloodField {
            dims,
            records: current,
        }
    }

    /// Signed distance field of the solid in `a`
    ///
    /// One run measures exterior distances from the solid, a second run on
    /// `-a` measures interior distances from empty space. Cells the first run
    /// places outside keep its distance; the rest take the negated second one.
    pub fn signed_distance(&self, a: &VoxelField, metric: Metric) -> VoxelField {
        let outside = self.jump_flood(a, metric);
        let inside = self.jump_flood(&-a, metric);

        let mut out = vec![0.0; a.cell_count()];
        self.launch(a.dims()).cells(&mut out, |_, idx, cell| {
            let d = outside.records[idx].distance;
            *cell = if d > 0.0 {
                d
            } else {
                -inside.records[idx].distance
            };
        });
        VoxelField::from_parts(a.dims(), out)
    }

    /// Collapse solid to a thin boundary marker
    ///
    /// Solid cells touching both empty and solid neighbours become `0`, other
    /// solid cells [`SIMPLIFIED_INSIDE`], empty cells [`SIMPLIFIED_OUTSIDE`].
    /// Only meant as a cheap input to [`Kernel::x_height`].
    pub fn simplify(&self, a: &VoxelField) -> VoxelField {
        let dims = a.dims();
        let src = a.data();
        let mut out = vec![0.0; src.len()];
        self.launch(dims).cells(&mut out, |p, idx, cell| {
            if src[idx] > 0.0 {
                *cell = SIMPLIFIED_OUTSIDE;
                return;
            }
            let (mut empty, mut solid) = (false, false);
            for (_, q) in stencil(p, 1, dims).filter(|(_, q)| *q != idx) {
                empty |= src[q] > 0.0;
                solid |= src[q] < 0.0;
                if empty && solid {
                    *cell = 0.0;
                    return;
                }
            }
            *cell = SIMPLIFIED_INSIDE;
        });
        VoxelField::from_parts(dims, out)
    }

    /// Depth-below-surface map along X
    ///
    /// Simplifies `a`, then sweeps slices from the top (high X) down: each
    /// solid cell becomes `min(-1, above - 1)`. The sweep is sequential
    /// because each slice reads the one just written above it.
    pub fn x_height(&self, a: &VoxelField) -> VoxelField {
        let mut out = self.simplify(a);
        let dims = a.dims();
        let plane = (dims.y * dims.z) as usize;
        let launch = self.launch(dims);

        for x in (0..dims.x.saturating_sub(1)).rev() {
            let start = x as usize * plane;
            let (lower, upper) = out.data_mut().split_at_mut(start + plane);
            let above = &upper[..plane];
            launch.columns(&mut lower[start..], |_, idx, cell| {
                if *cell <= 0.0 {
                    *cell = (-1.0f32).min(above[idx] - 1.0);
                }
            });
        }
        out
    }
}
