//! Built-in collaborators
//!
//! Enough to run the pipeline end to end from the command line: `.binvox`
//! input, hashed seed sampling, a jump-flood Voronoi lattice, binary STL output
//! and PNG slice plots.

pub mod binvox;
pub mod sampler;
pub mod slices;
pub mod stl;
pub mod voronoi;

pub use binvox::BinvoxVoxelizer;
pub use sampler::HashSampler;
pub use slices::PngSliceVisualizer;
pub use stl::StlExporter;
pub use voronoi::JumpFloodVoronoi;
