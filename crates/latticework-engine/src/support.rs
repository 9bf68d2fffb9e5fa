//! Support and model geometry built from SDF arithmetic
//!
//! Everything here is composition of core kernels. The build plate is at low
//! X, so "below" a cell means towards X = 0.

use crate::error::Result;
use glam::UVec3;
use latticework_core::{Kernel, VoxelField};

/// Offset that separates supports from the model surface, in voxels
pub const SUPPORT_GAP: f32 = 1.0;

/// Depth of the base table under the model's downward-facing surfaces
pub const TABLE_DEPTH: i32 = 3;

/// Silhouette of the model dropped onto the build plate
pub fn drop_region(kernel: &Kernel, model: &VoxelField) -> VoxelField {
    kernel.projection(model)
}

/// Space under overhangs that supports may fill
///
/// The dropped silhouette minus the model grown by [`SUPPORT_GAP`], then
/// intersected with itself shifted one cell down so single-cell slivers are
/// removed.
pub fn support_region(
    kernel: &Kernel,
    model: &VoxelField,
    dropped: &VoxelField,
) -> Result<VoxelField> {
    let clearance = kernel.thicken(model, SUPPORT_GAP);
    let region = kernel.subtract(&clearance, dropped)?;
    let lowered = kernel.translate(&region, -1, 0, 0);
    Ok(kernel.intersection(&region, &lowered)?)
}

/// Thin solid slab just under the model's downward-facing surfaces
///
/// Takes the band up to [`TABLE_DEPTH`] cells below each lower surface, moves it
/// one more cell down, keeps the part inside the dropped silhouette and clears
/// the gap around the model.
pub fn table(kernel: &Kernel, model: &VoxelField, dropped: &VoxelField) -> Result<VoxelField> {
    let lowered = kernel.translate(model, -TABLE_DEPTH, 0, 0);
    let underside = kernel.subtract(model, &lowered)?;
    let underside = kernel.translate(&underside, -1, 0, 0);
    let slab = kernel.intersection(&underside, dropped)?;
    Ok(kernel.subtract(&kernel.thicken(model, SUPPORT_GAP), &slab)?)
}

/// Field of `dims` with a solid cell at each point
///
/// Points outside the grid are ignored.
pub fn explode(dims: UVec3, points: &[UVec3]) -> VoxelField {
    let mut out = VoxelField::filled(dims, 1.0);
    for &p in points {
        if p.cmplt(dims).all() {
            out.set(p, -1.0);
        }
    }
    out
}

/// 2x2x2 blocks at each point, extending down in X and up in Y and Z
pub fn perforation(kernel: &Kernel, dims: UVec3, points: &[UVec3]) -> Result<VoxelField> {
    let holes = explode(dims, points);
    let holes = kernel.union(&holes, &kernel.translate(&holes, -1, 0, 0))?;
    let holes = kernel.union(&holes, &kernel.translate(&holes, 0, 1, 0))?;
    Ok(kernel.union(&holes, &kernel.translate(&holes, 0, 0, 1))?)
}

/// Hollow model for net mode: a `thickness` band inside the surface
pub fn net_model(kernel: &Kernel, sdf: &VoxelField, thickness: u32) -> VoxelField {
    kernel.shell(sdf, thickness as f32)
}
