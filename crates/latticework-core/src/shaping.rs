//! Whole-field reshaping: drop projection, cropping and smoothing

use crate::field::{Axis, cell_count};
use crate::kernel::{Kernel, stencil};
use crate::{Error, Result, VoxelField};
use glam::{IVec3, UVec3};

/// Value stamped into empty cells swept by [`Kernel::projection`]
pub const PROJECTION_FILL: f32 = -1.0;

/// A cropped field and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Condensed {
    pub field: VoxelField,
    /// Source index of condensed cell (0, 0, 0); negative when the buffer
    /// reaches past the source grid
    pub offset: IVec3,
}

impl Condensed {
    pub fn into_field(self) -> VoxelField {
        self.field
    }
}

impl Kernel {
    /// Drop every solid column straight down (towards X = 0) onto the plane of
    /// the lowest solid cell
    ///
    /// Each X slice depends on the slice above it, so slices are walked
    /// top to bottom on the host; each slice is a parallel (y, z) launch.
    /// Empty cells under solid are stamped with [`PROJECTION_FILL`]; solid cells
    /// keep their values. A field with no solid cell is returned unchanged.
    pub fn projection(&self, a: &VoxelField) -> VoxelField {
        let mut out = a.clone();
        let dims = a.dims();
        let Some(floor) = (0..dims.x).find(|&i| a.slice_x(i).iter().any(|&v| v < 0.0)) else {
            return out;
        };

        let plane = (dims.y * dims.z) as usize;
        let launch = self.launch(dims);
        for x in (floor..dims.x.saturating_sub(1)).rev() {
            let start = x as usize * plane;
            let (lower, upper) = out.data_mut().split_at_mut(start + plane);
            let above = &upper[..plane];
            launch.columns(&mut lower[start..], |_, idx, cell| {
                if *cell > 0.0 && above[idx] <= 0.0 {
                    *cell = PROJECTION_FILL;
                }
            });
        }
        out
    }

    /// Crop to the solid cells plus `buffer` empty voxels per side
    ///
    /// Extents come from six 1D boundary scans (first and last occupied slice
    /// along each axis). Each output dimension is rounded up to a multiple of
    /// the block size; cells that fall outside the source are filled with an
    /// exterior value.
    pub fn condense(&self, a: &VoxelField, buffer: u32) -> Result<Condensed> {
        let mut lo = [0u32; 3];
        let mut hi = [0u32; 3];
        for axis in Axis::ALL {
            let (first, last) = axis_extent(a, axis)
                .ok_or_else(|| Error::EmptyField("nothing to condense".to_string()))?;
            lo[axis.index()] = first;
            hi[axis.index()] = last;
        }
        let lo = UVec3::from_array(lo);
        let hi = UVec3::from_array(hi);

        let block = self.block_size();
        let span = hi - lo + UVec3::ONE + UVec3::splat(2 * buffer);
        let dims = (span + UVec3::splat(block - 1)) / block * block;
        let offset = lo.as_ivec3() - IVec3::splat(buffer as i32);
        let fill = a.max_value().max(1.0);

        let mut out = vec![0.0; cell_count(dims)];
        self.launch(dims).cells(&mut out, |p, _, cell| {
            *cell = a.get_checked(p.as_ivec3() + offset).unwrap_or(fill);
        });
        Ok(Condensed {
            field: VoxelField::from_parts(dims, out),
            offset,
        })
    }

    /// Put a condensed field back into a grid of `dims`, filling the rest
    pub fn restore(&self, condensed: &Condensed, dims: UVec3, fill: f32) -> VoxelField {
        let mut out = vec![0.0; cell_count(dims)];
        self.launch(dims).cells(&mut out, |p, _, cell| {
            *cell = condensed
                .field
                .get_checked(p.as_ivec3() - condensed.offset)
                .unwrap_or(fill);
        });
        VoxelField::from_parts(dims, out)
    }

    /// Box-filter `iterations` times over the 27-cell neighbourhood
    ///
    /// Cells within `buffer` of any face pass through unchanged. Neighbours
    /// outside the grid are left out of the average.
    pub fn smooth(&self, a: &VoxelField, iterations: u32, buffer: u32) -> VoxelField {
        let dims = a.dims();
        let launch = self.launch(dims);
        let mut current = a.data().to_vec();
        let mut next = current.clone();

        for _ in 0..iterations {
            let read = &current;
            launch.cells(&mut next, |p, idx, cell| {
                let near_face = p.cmplt(UVec3::splat(buffer)).any()
                    || (p + UVec3::splat(buffer)).cmpge(dims).any();
                if near_face {
                    *cell = read[idx];
                    return;
                }
                let (sum, count) = stencil(p, 1, dims)
                    .fold((0.0f32, 0u32), |(sum, count), (_, q)| (sum + read[q], count + 1));
                *cell = sum / count as f32;
            });
            std::mem::swap(&mut current, &mut next);
        }
        VoxelField::from_parts(dims, current)
    }
}

/// First and last slice along `axis` containing a cell `< 0`
fn axis_extent(a: &VoxelField, axis: Axis) -> Option<(u32, u32)> {
    let n = a.dims().to_array()[axis.index()];
    let occupied = |index: u32| {
        a.slice(axis, index)
            .is_some_and(|s| s.values.iter().any(|&v| v < 0.0))
    };
    let first = (0..n).find(|&i| occupied(i))?;
    let last = (0..n).rev().find(|&i| occupied(i))?;
    Some((first, last))
}
