//! Interfaces to the work the pipeline delegates
//!
//! The pipeline owns the kernels; voxelizing meshes, picking seed points,
//! growing lattices, writing meshes and drawing slices are behind these traits.
//! [`Collaborators::builtin`] wires up the implementations in [`crate::builtin`].

use crate::builtin::{
    BinvoxVoxelizer, HashSampler, JumpFloodVoronoi, PngSliceVisualizer, StlExporter,
};
use crate::error::Result;
use glam::{UVec3, Vec3};
use latticework_core::{Axis, Kernel, VoxelField};
use std::path::Path;

/// Occupancy grid produced from a mesh file
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelizedMesh {
    /// Occupied cells `<= 0`, padded by the requested buffer on every side
    pub field: VoxelField,
    /// Physical size of the mesh bounding box in mm
    pub extents: Vec3,
}

/// Turns a mesh file into an occupancy field
pub trait Voxelizer: Send + Sync {
    /// Voxelize `path` to `resolution` cells along its longest axis, then pad
    /// by `buffer` empty cells per side
    fn voxelize(
        &self,
        kernel: &Kernel,
        path: &Path,
        resolution: u32,
        buffer: u32,
    ) -> Result<VoxelizedMesh>;
}

/// Picks lattice seed points
pub trait PointSampler: Send + Sync {
    /// Cell coordinates inside the region selected by `threshold`, in no
    /// particular order
    fn sample(&self, field: &VoxelField, threshold: f32) -> Vec<UVec3>;
}

/// Input to a lattice synthesizer
#[derive(Debug, Clone, Copy)]
pub struct LatticeRequest<'a> {
    /// Solid the lattice is clipped to
    pub base: &'a VoxelField,
    pub seeds: &'a [UVec3],
    /// Target wall size in voxels
    pub cell_size: f32,
    /// Voxels of solid skin kept around the lattice; 0 for none
    pub shell_count: u32,
    /// mm per voxel
    pub scale: Vec3,
    /// Label for logs and plots
    pub name: &'a str,
}

/// Grows a Voronoi-style cell structure from seed points
pub trait LatticeSynthesizer: Send + Sync {
    /// Return a field, same shape as `request.base`, whose zero level set
    /// approximates the cell walls
    fn synthesize(&self, kernel: &Kernel, request: &LatticeRequest<'_>) -> Result<VoxelField>;
}

/// Persists a final field as a polygon mesh
pub trait MeshExporter: Send + Sync {
    fn export(&self, field: &VoxelField, scale: Vec3, name: &str) -> Result<()>;
}

/// Diagnostic plots; never affects pipeline state
pub trait SliceVisualizer: Send + Sync {
    /// Filled plot of one slice
    fn slice_plot(&self, field: &VoxelField, axis: Axis, index: u32, title: &str);

    /// Boundary-only plot of one slice
    fn contour_plot(&self, field: &VoxelField, axis: Axis, index: u32, title: &str);

    /// One image per X slice, colouring the solid of each field
    fn image_stack(
        &self,
        first: &VoxelField,
        first_color: [u8; 3],
        second: &VoxelField,
        second_color: [u8; 3],
        name: &str,
    );
}

/// The full set of collaborators a pipeline runs with
pub struct Collaborators {
    pub voxelizer: Box<dyn Voxelizer>,
    pub sampler: Box<dyn PointSampler>,
    pub synthesizer: Box<dyn LatticeSynthesizer>,
    pub exporter: Box<dyn MeshExporter>,
    pub visualizer: Box<dyn SliceVisualizer>,
}

impl Collaborators {
    /// Built-in implementations writing under `output_dir`
    pub fn builtin(output_dir: &Path) -> Self {
        Self {
            voxelizer: Box::new(BinvoxVoxelizer),
            sampler: Box::new(HashSampler::default()),
            synthesizer: Box::new(JumpFloodVoronoi::default()),
            exporter: Box::new(StlExporter::new(output_dir)),
            visualizer: Box::new(PngSliceVisualizer::new(output_dir)),
        }
    }

    pub fn with_voxelizer(mut self, voxelizer: impl Voxelizer + 'static) -> Self {
        self.voxelizer = Box::new(voxelizer);
        self
    }

    pub fn with_sampler(mut self, sampler: impl PointSampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: impl LatticeSynthesizer + 'static) -> Self {
        self.synthesizer = Box::new(synthesizer);
        self
    }

    pub fn with_exporter(mut self, exporter: impl MeshExporter + 'static) -> Self {
        self.exporter = Box::new(exporter);
        self
    }

    pub fn with_visualizer(mut self, visualizer: impl SliceVisualizer + 'static) -> Self {
        self.visualizer = Box::new(visualizer);
        self
    }
}
