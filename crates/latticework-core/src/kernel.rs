//! Stencil launches
//!
//! Every kernel-backed operation goes through [`Launch`]: one logical thread per
//! cell (or per column for slice-wise work), grouped into blocks of
//! `block_size` along the leading axis. Blocks are handed to rayon as disjoint
//! slabs of the output buffer, so a body can only ever write its own cell and
//! reads must come from a different buffer.
//!
//! Launches are blocking. When `cells` returns, the whole output is written.

use crate::field::{cell_count, flat_index};
use glam::{IVec3, UVec2, UVec3};
use rayon::prelude::*;

/// Threads per block used when nothing else is configured
pub const DEFAULT_BLOCK_SIZE: u32 = 8;

/// Entry point for every voxel operation
///
/// Carries the block size shared by all launches. Operations are spread over
/// several modules as `impl Kernel` blocks: primitives, CSG, shaping, analysis
/// and distance transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    block_size: u32,
}

impl Kernel {
    /// Create a kernel with the given threads-per-block (clamped to at least 1)
    pub fn new(block_size: u32) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Size a launch over a grid of `dims`
    pub fn launch(&self, dims: UVec3) -> Launch {
        launch(dims, self.block_size)
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

/// Grid and block sizing for one kernel invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launch {
    dims: UVec3,
    block_size: u32,
}

/// Size a launch over `dims` with `block_size` threads per block along each axis
pub fn launch(dims: UVec3, block_size: u32) -> Launch {
    Launch {
        dims,
        block_size: block_size.max(1),
    }
}

impl Launch {
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Number of blocks along each axis
    pub fn grid_dims(&self) -> UVec3 {
        (self.dims + UVec3::splat(self.block_size - 1)) / self.block_size
    }

    /// Run `body` once per cell of a 3D grid
    ///
    /// `body` receives the cell position, its flat index and a mutable
    /// reference to that cell of `out`. `out` must hold exactly one element per
    /// cell; positions handed to `body` are always in bounds.
    pub fn cells<T, F>(&self, out: &mut [T], body: F)
    where
        T: Send,
        F: Fn(UVec3, usize, &mut T) + Sync,
    {
        debug_assert_eq!(out.len(), cell_count(self.dims));
        let ny = self.dims.y as usize;
        let nz = self.dims.z as usize;
        let plane = ny * nz;
        if plane == 0 {
            return;
        }
        let slab = plane * self.block_size as usize;

        out.par_chunks_mut(slab)
            .enumerate()
            .for_each(|(block, chunk)| {
                let base = block * slab;
                for (offset, cell) in chunk.iter_mut().enumerate() {
                    let idx = base + offset;
                    let p = UVec3::new(
                        (idx / plane) as u32,
                        ((idx / nz) % ny) as u32,
                        (idx % nz) as u32,
                    );
                    body(p, idx, cell);
                }
            });
    }

    /// Run `body` once per (y, z) column of a single X slice
    ///
    /// `plane` is the slice's `ny * nz` cells; `body` receives the column
    /// position, its index within the plane and the cell to write.
    pub fn columns<T, F>(&self, plane: &mut [T], body: F)
    where
        T: Send,
        F: Fn(UVec2, usize, &mut T) + Sync,
    {
        let nz = self.dims.z as usize;
        debug_assert_eq!(plane.len(), self.dims.y as usize * nz);
        if nz == 0 {
            return;
        }
        let rows = nz * self.block_size as usize;

        plane
            .par_chunks_mut(rows)
            .enumerate()
            .for_each(|(block, chunk)| {
                let base = block * rows;
                for (offset, cell) in chunk.iter_mut().enumerate() {
                    let idx = base + offset;
                    body(UVec2::new((idx / nz) as u32, (idx % nz) as u32), idx, cell);
                }
            });
    }
}

/// The 27 offsets of a 3x3x3 neighbourhood, self included, in x-major order
pub(crate) const NEIGHBOURHOOD: [IVec3; 27] = {
    let mut out = [IVec3::ZERO; 27];
    let mut n = 0;
    while n < 27 {
        out[n] = IVec3::new((n as i32 / 9) % 3 - 1, (n as i32 / 3) % 3 - 1, n as i32 % 3 - 1);
        n += 1;
    }
    out
};

/// In-bounds neighbours of `p` at `step` spacing (self included)
pub(crate) fn stencil(p: UVec3, step: u32, dims: UVec3) -> impl Iterator<Item = (UVec3, usize)> {
    let origin = p.as_ivec3();
    let step = step as i32;
    let limit = dims.as_ivec3();
    NEIGHBOURHOOD.iter().filter_map(move |offset| {
        let q = origin + *offset * step;
        (q.cmpge(IVec3::ZERO).all() && q.cmplt(limit).all()).then(|| {
            let q = q.as_uvec3();
            (q, flat_index(dims, q))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_dims_round_up() {
        let l = launch(UVec3::new(17, 8, 1), 8);
        assert_eq!(l.grid_dims(), UVec3::new(3, 1, 1));
        assert_eq!(launch(UVec3::ONE, 0).block_size(), 1);
    }

    #[test]
    fn cells_visits_every_position_once() {
        let dims = UVec3::new(5, 3, 7);
        let mut out = vec![UVec3::MAX; cell_count(dims)];
        launch(dims, 2).cells(&mut out, |p, idx, cell| {
            assert_eq!(flat_index(dims, p), idx);
            *cell = p;
        });
        for (idx, p) in out.iter().enumerate() {
            assert_eq!(flat_index(dims, *p), idx);
        }
    }

    #[test]
    fn columns_cover_plane() {
        let dims = UVec3::new(1, 5, 3);
        let mut plane = vec![0u32; 15];
        launch(dims, 4).columns(&mut plane, |c, idx, cell| {
            assert_eq!((c.x * 3 + c.y) as usize, idx);
            *cell += 1;
        });
        assert!(plane.iter().all(|&v| v == 1));
    }

    #[test]
    fn stencil_skips_out_of_bounds() {
        let dims = UVec3::splat(4);
        assert_eq!(stencil(UVec3::ZERO, 1, dims).count(), 8);
        assert_eq!(stencil(UVec3::splat(1), 1, dims).count(), 27);
        assert_eq!(stencil(UVec3::splat(1), 2, dims).count(), 8);
        assert_eq!(NEIGHBOURHOOD[13], IVec3::ZERO);
    }
}
