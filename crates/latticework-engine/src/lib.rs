//! Latticework Engine - Fabrication pipeline on top of the voxel kernels
//!
//! The engine sequences `latticework-core` kernels into a fabrication run:
//! source geometry to SDF, support structures, Voronoi lattices, export.
//! Work that is not SDF arithmetic (voxelizing meshes, sampling seeds,
//! growing lattices, writing meshes, plotting) goes through the traits in
//! [`collaborators`].
//!
//! ## Example
//!
//! ```ignore
//! use latticework_engine::{Collaborators, Pipeline, PipelineConfig};
//! use latticework_core::Primitive;
//!
//! let config = PipelineConfig::default()
//!     .with_primitive(Primitive::Silo)
//!     .with_targets(true, true)
//!     .with_resolution(120);
//!
//! let pipeline = Pipeline::new(Collaborators::builtin(&config.output_dir));
//! let report = pipeline.run(&config)?;
//! println!("exported {:?}", report.artifacts);
//! ```

pub mod builtin;
pub mod collaborators;
pub mod config;
pub mod pipeline;
pub mod support;

mod error;

pub use collaborators::{
    Collaborators, LatticeRequest, LatticeSynthesizer, MeshExporter, PointSampler,
    SliceVisualizer, VoxelizedMesh, Voxelizer,
};
pub use config::{PipelineConfig, Source};
pub use error::{PipelineError, Result};
pub use pipeline::{Branch, Pipeline, PipelineReport};
