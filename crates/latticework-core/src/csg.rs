//! Boolean operations and offsets on voxel fields
//!
//! All operators keep SDF semantics: union takes the nearer surface,
//! intersection the farther one. Pointwise operators require operands of
//! identical dimensions.

use crate::field::cell_count;
use crate::kernel::Kernel;
use crate::{Result, VoxelField};
use glam::IVec3;

impl Kernel {
    /// Apply `f` to every cell of `a`
    pub fn map<F>(&self, a: &VoxelField, f: F) -> VoxelField
    where
        F: Fn(f32) -> f32 + Sync,
    {
        let src = a.data();
        let mut out = vec![0.0; src.len()];
        self.launch(a.dims())
            .cells(&mut out, |_, idx, cell| *cell = f(src[idx]));
        VoxelField::from_parts(a.dims(), out)
    }

    /// Combine two same-shaped fields cell by cell
    pub fn pointwise<F>(&self, a: &VoxelField, b: &VoxelField, f: F) -> Result<VoxelField>
    where
        F: Fn(f32, f32) -> f32 + Sync,
    {
        a.ensure_same_shape(b)?;
        let (lhs, rhs) = (a.data(), b.data());
        let mut out = vec![0.0; lhs.len()];
        self.launch(a.dims())
            .cells(&mut out, |_, idx, cell| *cell = f(lhs[idx], rhs[idx]));
        Ok(VoxelField::from_parts(a.dims(), out))
    }

    // ========================================================================
    // Boolean Operations
    // ========================================================================

    /// Union: `min(a, b)`
    pub fn union(&self, a: &VoxelField, b: &VoxelField) -> Result<VoxelField> {
        self.pointwise(a, b, f32::min)
    }

    /// Intersection: `-min(-a, -b)`
    pub fn intersection(&self, a: &VoxelField, b: &VoxelField) -> Result<VoxelField> {
        self.pointwise(a, b, |u, v| -(-u).min(-v))
    }

    /// Cut `tool` out of `base`: `-min(-base, tool)`
    pub fn subtract(&self, tool: &VoxelField, base: &VoxelField) -> Result<VoxelField> {
        self.pointwise(tool, base, |t, b| -(-b).min(t))
    }

    // ========================================================================
    // Transforms and offsets
    // ========================================================================

    /// Shift by whole voxels with toroidal wraparound
    ///
    /// Cells pushed past one face re-enter at the opposite face, so the field
    /// needs at least `|d|` voxels of empty padding on the trailing side.
    pub fn translate(&self, a: &VoxelField, dx: i32, dy: i32, dz: i32) -> VoxelField {
        let dims = a.dims();
        let shift = IVec3::new(dx, dy, dz);
        let limit = dims.as_ivec3();
        let src = a.data();
        let mut out = vec![0.0; cell_count(dims)];
        self.launch(dims).cells(&mut out, |p, _, cell| {
            let from = (p.as_ivec3() - shift).rem_euclid(limit).as_uvec3();
            *cell = src[a.index_of(from)];
        });
        VoxelField::from_parts(dims, out)
    }

    /// Uniform offset `a - weight`; grows the solid while `a` is an exact SDF
    pub fn thicken(&self, a: &VoxelField, weight: f32) -> VoxelField {
        self.map(a, |u| u - weight)
    }

    /// Band of `thickness` just inside the surface: `intersection(a, -a - t)`
    pub fn shell(&self, a: &VoxelField, thickness: f32) -> VoxelField {
        // -min(-a, -(-a - t)) with the inner negation folded
        self.map(a, |u| -(-u).min(u + thickness))
    }
}
