//! Primitive solids evaluated over coordinate grids
//!
//! Each primitive evaluates a closed-form implicit function at every cell of a
//! [`CoordGrid`]. Only the sphere and box are exact distances; the others are
//! implicit surfaces whose sign is what matters, since the pipeline rebuilds an
//! exact field with the jump-flood transform afterwards.

use crate::kernel::Kernel;
use crate::{Error, Result, VoxelField};
use glam::{UVec3, Vec3};
use std::fmt;
use std::str::FromStr;

/// `n` evenly spaced samples from `min` to `max` inclusive
pub fn linspace(min: f32, max: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (n - 1) as f32;
            (0..n).map(|i| min + step * i as f32).collect()
        }
    }
}

/// Coordinate vectors for the three axes of a sampling grid
#[derive(Debug, Clone, PartialEq)]
pub struct CoordGrid {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
}

impl CoordGrid {
    pub fn new(x: Vec<f32>, y: Vec<f32>, z: Vec<f32>) -> Self {
        Self { x, y, z }
    }

    /// Same `linspace(min, max, n)` on all three axes
    pub fn cube(min: f32, max: f32, n: usize) -> Self {
        let axis = linspace(min, max, n);
        Self::new(axis.clone(), axis.clone(), axis)
    }

    pub fn dims(&self) -> UVec3 {
        UVec3::new(self.x.len() as u32, self.y.len() as u32, self.z.len() as u32)
    }

    /// Physical size covered by the grid (last minus first coordinate)
    pub fn extent(&self) -> Vec3 {
        Vec3::new(span(&self.x), span(&self.y), span(&self.z))
    }

    /// Distance between neighbouring samples on each axis
    ///
    /// Axes with fewer than two samples report a spacing of 1.
    pub fn spacing(&self) -> Vec3 {
        let step = |axis: &[f32]| {
            if axis.len() < 2 {
                1.0
            } else {
                span(axis) / (axis.len() - 1) as f32
            }
        };
        Vec3::new(step(&self.x), step(&self.y), step(&self.z))
    }

    fn point(&self, p: UVec3) -> Vec3 {
        Vec3::new(
            self.x[p.x as usize],
            self.y[p.y as usize],
            self.z[p.z as usize],
        )
    }
}

fn span(axis: &[f32]) -> f32 {
    match (axis.first(), axis.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    }
}

// ============================================================================
// Primitive kernels
// ============================================================================

impl Kernel {
    /// Evaluate `f` at the coordinates of every grid cell
    pub fn evaluate<F>(&self, grid: &CoordGrid, f: F) -> VoxelField
    where
        F: Fn(Vec3) -> f32 + Sync,
    {
        let dims = grid.dims();
        let mut out = vec![0.0; crate::field::cell_count(dims)];
        self.launch(dims)
            .cells(&mut out, |p, _, cell| *cell = f(grid.point(p)));
        VoxelField::from_parts(dims, out)
    }

    /// Sphere of `radius` centred at the origin
    pub fn sphere(&self, grid: &CoordGrid, radius: f32) -> VoxelField {
        self.evaluate(grid, |p| p.length() - radius)
    }

    /// Axis-aligned box with side `lengths`, centred at `origin`
    pub fn rect(&self, grid: &CoordGrid, lengths: Vec3, origin: Vec3) -> VoxelField {
        let half = lengths * 0.5;
        self.evaluate(grid, |p| ((p - origin).abs() - half).max_element())
    }

    /// Cylinder along X between `start` and `stop` with the given radius
    pub fn cylinder_x(&self, grid: &CoordGrid, start: f32, stop: f32, radius: f32) -> VoxelField {
        self.evaluate(grid, |p| {
            let height = (p.x - start) * (p.x - stop);
            let width = (p.y * p.y + p.z * p.z).sqrt() - radius;
            height.max(width)
        })
    }

    /// Cylinder along Y between `start` and `stop` with the given radius
    pub fn cylinder_y(&self, grid: &CoordGrid, start: f32, stop: f32, radius: f32) -> VoxelField {
        self.evaluate(grid, |p| {
            let height = (p.y - start) * (p.y - stop);
            let width = (p.x * p.x + p.z * p.z).sqrt() - radius;
            height.max(width)
        })
    }

    /// Taubin's heart surface centred at `center` (about 3 units across)
    pub fn heart(&self, grid: &CoordGrid, center: Vec3) -> VoxelField {
        self.evaluate(grid, |p| {
            let Vec3 { x, y, z } = p - center;
            let z3 = z * z * z;
            (x * x + 9.0 * y * y / 4.0 + z * z - 1.0).powi(3)
                - x * x * z3
                - 9.0 * y * y * z3 / 80.0
        })
    }

    /// Egg-shaped quartic centred at `center`, pointed end towards -X
    pub fn egg(&self, grid: &CoordGrid, center: Vec3) -> VoxelField {
        self.evaluate(grid, |p| {
            let Vec3 { x, y, z } = p - center;
            let r2 = y * y + z * z;
            9.0 * x * x + 16.0 * r2 + 2.0 * x * r2 + r2 - 144.0
        })
    }
}

// ============================================================================
// Named primitives
// ============================================================================

/// Built-in procedural sources, selectable by tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Heart,
    Egg,
    Cube,
    Silo,
    Cylinder,
    Sphere,
}

impl Primitive {
    pub const ALL: [Primitive; 6] = [
        Primitive::Heart,
        Primitive::Egg,
        Primitive::Cube,
        Primitive::Silo,
        Primitive::Cylinder,
        Primitive::Sphere,
    ];

    /// The tag used in configuration files
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Heart => "Heart",
            Primitive::Egg => "Egg",
            Primitive::Cube => "Cube",
            Primitive::Silo => "Silo",
            Primitive::Cylinder => "Cylinder",
            Primitive::Sphere => "Sphere",
        }
    }

    /// Sampling grid for this primitive at `resolution` cells per axis
    pub fn coord_grid(self, resolution: u32) -> CoordGrid {
        let n = resolution as usize;
        match self {
            Primitive::Heart => CoordGrid::cube(-1.5, 1.5, n),
            Primitive::Egg => CoordGrid::cube(-5.0, 5.0, n),
            _ => CoordGrid::cube(-50.0, 50.0, n),
        }
    }

    /// Evaluate the primitive over its own grid
    pub fn build(self, kernel: &Kernel, resolution: u32) -> Result<VoxelField> {
        let grid = self.coord_grid(resolution);
        let field = match self {
            Primitive::Heart => kernel.heart(&grid, Vec3::ZERO),
            Primitive::Egg => kernel.egg(&grid, Vec3::ZERO),
            Primitive::Cube => kernel.rect(&grid, Vec3::splat(80.0), Vec3::ZERO),
            Primitive::Silo => kernel.union(
                &kernel.sphere(&grid, 40.0),
                &kernel.cylinder_y(&grid, -40.0, 0.0, 40.0),
            )?,
            Primitive::Cylinder => kernel.cylinder_x(&grid, -40.0, 40.0, 40.0),
            Primitive::Sphere => kernel.sphere(&grid, 40.0),
        };
        Ok(field)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Primitive {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Primitive::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownPrimitive(s.to_string()))
    }
}
