//! Dense voxel fields
//!
//! A [`VoxelField`] is the universal unit of computation: a fixed-size 3D array
//! of `f32` cells. Values are signed distances (negative inside) or, before the
//! distance transform runs, raw occupancy flags where `<= 0` means solid.

use crate::{Error, Result};
use glam::{IVec3, UVec3};
use rayon::prelude::*;
use std::ops::Neg;

/// Grid axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (0 for X, 1 for Y, 2 for Z)
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Lowercase axis name
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// A 2D cut through a field, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
}

impl Slice {
    pub fn get(&self, col: u32, row: u32) -> f32 {
        self.values[(row * self.width + col) as usize]
    }
}

/// Dense 3D array of `f32` cells with fixed dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelField {
    dims: UVec3,
    data: Vec<f32>,
}

impl VoxelField {
    /// Create a field with every cell set to `value`
    pub fn filled(dims: UVec3, value: f32) -> Self {
        Self {
            dims,
            data: vec![value; cell_count(dims)],
        }
    }

    /// Wrap an existing buffer. The buffer length must match `dims`.
    pub fn from_vec(dims: UVec3, data: Vec<f32>) -> Result<Self> {
        if data.len() != cell_count(dims) {
            return Err(Error::InvalidParameter(format!(
                "buffer of {} cells does not match dims {:?}",
                data.len(),
                dims.to_array()
            )));
        }
        Ok(Self { dims, data })
    }

    /// Internal constructor for buffers produced by a launch over `dims`
    pub(crate) fn from_parts(dims: UVec3, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), cell_count(dims));
        Self { dims, data }
    }

    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Flat index of cell `p`
    pub fn index_of(&self, p: UVec3) -> usize {
        flat_index(self.dims, p)
    }

    /// Cell coordinates of flat index `idx`
    pub fn position(&self, idx: usize) -> UVec3 {
        let ny = self.dims.y as usize;
        let nz = self.dims.z as usize;
        UVec3::new(
            (idx / (ny * nz)) as u32,
            ((idx / nz) % ny) as u32,
            (idx % nz) as u32,
        )
    }

    pub fn contains(&self, p: IVec3) -> bool {
        p.cmpge(IVec3::ZERO).all() && p.cmplt(self.dims.as_ivec3()).all()
    }

    pub fn get(&self, p: UVec3) -> f32 {
        self.data[self.index_of(p)]
    }

    /// Value at a possibly out-of-range position
    pub fn get_checked(&self, p: IVec3) -> Option<f32> {
        self.contains(p).then(|| self.get(p.as_uvec3()))
    }

    pub fn set(&mut self, p: UVec3, value: f32) {
        let idx = self.index_of(p);
        self.data[idx] = value;
    }

    pub fn same_shape(&self, other: &VoxelField) -> bool {
        self.dims == other.dims
    }

    /// Fail with [`Error::ShapeMismatch`] unless both fields have the same dims
    pub fn ensure_same_shape(&self, other: &VoxelField) -> Result<()> {
        if self.same_shape(other) {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                left: self.dims.to_array(),
                right: other.dims.to_array(),
            })
        }
    }

    /// Number of solid cells (`value <= 0`)
    pub fn occupied_count(&self) -> usize {
        self.data.par_iter().filter(|&&v| v <= 0.0).count()
    }

    /// True when no cell is solid
    pub fn is_vacant(&self) -> bool {
        !self.data.par_iter().any(|&v| v <= 0.0)
    }

    pub fn min_value(&self) -> f32 {
        self.data
            .par_iter()
            .copied()
            .reduce(|| f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data
            .par_iter()
            .copied()
            .reduce(|| f32::NEG_INFINITY, f32::max)
    }

    /// Contiguous cells of the X slice `i`
    pub fn slice_x(&self, i: u32) -> &[f32] {
        let plane = (self.dims.y * self.dims.z) as usize;
        let start = i as usize * plane;
        &self.data[start..start + plane]
    }

    /// Extract a 2D cut perpendicular to `axis`
    ///
    /// Rows and columns follow the remaining two axes in X, Y, Z order.
    /// Returns `None` when `index` is outside the field.
    pub fn slice(&self, axis: Axis, index: u32) -> Option<Slice> {
        let d = self.dims;
        if index >= d.to_array()[axis.index()] {
            return None;
        }
        let (height, width) = match axis {
            Axis::X => (d.y, d.z),
            Axis::Y => (d.x, d.z),
            Axis::Z => (d.x, d.y),
        };
        let values = (0..height)
            .flat_map(|row| (0..width).map(move |col| (row, col)))
            .map(|(row, col)| {
                let p = match axis {
                    Axis::X => UVec3::new(index, row, col),
                    Axis::Y => UVec3::new(row, index, col),
                    Axis::Z => UVec3::new(row, col, index),
                };
                self.get(p)
            })
            .collect();
        Some(Slice {
            width,
            height,
            values,
        })
    }
}

impl Neg for &VoxelField {
    type Output = VoxelField;

    fn neg(self) -> VoxelField {
        VoxelField {
            dims: self.dims,
            data: self.data.par_iter().map(|&v| -v).collect(),
        }
    }
}

pub(crate) fn cell_count(dims: UVec3) -> usize {
    dims.x as usize * dims.y as usize * dims.z as usize
}

pub(crate) fn flat_index(dims: UVec3, p: UVec3) -> usize {
    (p.x as usize * dims.y as usize + p.y as usize) * dims.z as usize + p.z as usize
}
