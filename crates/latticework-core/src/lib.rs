//! # Latticework Core
//!
//! Voxel field kernels for generative fabrication.
//!
//! Everything here operates on dense [`VoxelField`]s: one `f32` per cell holding
//! a signed distance (negative inside, positive outside, zero on the surface)
//! or, before conversion, a raw occupancy flag.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use latticework_core::prelude::*;
//!
//! let kernel = Kernel::new(8);
//! let grid = CoordGrid::cube(-20.0, 19.0, 40);
//!
//! // Carve a cylinder out of a sphere, then rebuild an exact distance field
//! let solid = kernel.subtract(
//!     &kernel.cylinder_x(&grid, -20.0, 20.0, 4.0),
//!     &kernel.sphere(&grid, 10.0),
//! )?;
//! let sdf = kernel.signed_distance(&solid, Metric::Euclidean);
//! let volume = kernel.volume(&sdf, Vec3::ONE);
//! ```
//!
//! ## Conventions
//!
//! - **Layout**: x-major, `index = (i * ny + j) * nz + k`
//! - **Gravity**: the build plate sits at low X; "down" means decreasing X
//! - **Allocation**: every operation returns a new field, inputs are never mutated

pub mod analysis;
pub mod csg;
pub mod distance;
pub mod field;
pub mod kernel;
pub mod primitives;
pub mod shaping;

mod error;

pub use analysis::MaterialReport;
pub use distance::{JumpFloodField, JumpFloodRecord, Metric};
pub use error::{Error, Result};
pub use field::{Axis, Slice, VoxelField};
pub use kernel::{DEFAULT_BLOCK_SIZE, Kernel, Launch};
pub use primitives::{CoordGrid, Primitive};
pub use shaping::Condensed;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::MaterialReport;
    pub use crate::distance::{JumpFloodField, JumpFloodRecord, Metric};
    pub use crate::field::{Axis, VoxelField};
    pub use crate::kernel::{Kernel, Launch};
    pub use crate::primitives::{CoordGrid, Primitive, linspace};
    pub use crate::shaping::Condensed;

    // Math (re-export glam)
    pub use glam::{IVec3, UVec2, UVec3, Vec3};

    // Error handling
    pub use crate::{Error, Result};
}
