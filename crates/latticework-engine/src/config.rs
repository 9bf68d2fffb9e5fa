//! Pipeline configuration
//!
//! A [`PipelineConfig`] is fixed before a run and only ever read by the
//! pipeline. It can be loaded from JSON (missing keys take their defaults) and
//! adjusted with the `with_*` builders.

use crate::error::{PipelineError, Result};
use latticework_core::Primitive;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a pipeline run needs to know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Material density in g/cm^3
    pub material_density: f64,

    /// Build the model lattice
    pub model: bool,

    /// Build the support lattice
    pub support: bool,

    /// Export model and supports as separate meshes
    pub separate_supports: bool,

    /// Punch holes through the support lattice at its seed points
    pub perforate: bool,

    /// Write a per-slice image stack of the result
    pub image_stack: bool,

    /// Keep a thinned copy of the solid inside the lattice
    pub aesthetic: bool,

    /// Also export the mold (solid minus model lattice)
    pub inverse: bool,

    /// Hollow the model to a shell before building lattices
    pub net: bool,

    /// Box-filter fields before export
    pub smooth: bool,

    /// Shell thickness in voxels for net mode
    pub net_thickness: u32,

    /// Empty voxels kept around the geometry on each side
    pub buffer: u32,

    /// Threads per block for every kernel launch
    pub block_size: u32,

    /// Cells per axis of the source grid
    pub resolution: u32,

    pub model_threshold: f32,
    pub model_shell: u32,
    pub model_cell: f32,
    pub support_threshold: f32,
    pub support_cell: f32,

    /// Input mesh, relative to `input_dir`; takes precedence over the primitive
    pub file_name: String,

    /// Primitive tag, used when `file_name` is empty
    pub primitive_type: String,

    pub input_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Base name for exported artifacts; defaults to the source name
    pub output_name: Option<String>,

    /// Hand the final fields to the mesh exporter
    pub export: bool,

    /// Sampling band and thinning offset of aesthetic mode, in voxels
    pub aesthetic_shell: u32,

    /// Smoothing passes before export
    pub smooth_iterations: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            material_density: 1.25,
            model: true,
            support: false,
            separate_supports: true,
            perforate: false,
            image_stack: false,
            aesthetic: false,
            inverse: false,
            net: false,
            smooth: true,
            net_thickness: 4,
            buffer: 4,
            block_size: 8,
            resolution: 300,
            model_threshold: 0.1,
            model_shell: 3,
            model_cell: 0.9,
            support_threshold: 0.2,
            support_cell: 0.7,
            file_name: String::new(),
            primitive_type: String::new(),
            input_dir: PathBuf::from("Input"),
            output_dir: PathBuf::from("Output"),
            output_name: None,
            export: true,
            aesthetic_shell: 5,
            smooth_iterations: 1,
        }
    }
}

/// Where the geometry of a run comes from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Mesh file handed to the voxelizer
    File(PathBuf),
    /// Built-in procedural solid
    Primitive(Primitive),
}

impl PipelineConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // ========================================================================
    // Builders
    // ========================================================================

    pub fn with_primitive(mut self, primitive: Primitive) -> Self {
        self.primitive_type = primitive.name().to_string();
        self.file_name.clear();
        self
    }

    pub fn with_file(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_targets(mut self, model: bool, support: bool) -> Self {
        self.model = model;
        self.support = support;
        self
    }

    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_buffer(mut self, buffer: u32) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn with_smoothing(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn with_export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Resolve the geometry source named by this configuration
    pub fn source(&self) -> Result<Source> {
        if !self.file_name.is_empty() {
            let path = self.input_dir.join(&self.file_name);
            if !path.is_file() {
                return Err(PipelineError::SourceNotFound(path));
            }
            return Ok(Source::File(path));
        }
        if !self.primitive_type.is_empty() {
            return self
                .primitive_type
                .parse::<Primitive>()
                .map(Source::Primitive)
                .map_err(|_| PipelineError::UnknownPrimitive(self.primitive_type.clone()));
        }
        Err(PipelineError::NoSource)
    }

    /// Check everything that can be checked before any kernel work
    ///
    /// Returns the resolved source on success.
    pub fn validate(&self) -> Result<Source> {
        if !self.model && !self.support {
            return Err(PipelineError::NoTarget);
        }
        let source = self.source()?;

        if self.block_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "block_size must be at least 1".to_string(),
            ));
        }
        let min_resolution = match source {
            Source::File(_) => 2 * self.buffer + 2,
            Source::Primitive(_) => 2,
        };
        if self.resolution < min_resolution {
            return Err(PipelineError::InvalidConfig(format!(
                "resolution {} is below the minimum of {min_resolution}",
                self.resolution
            )));
        }
        if self.material_density <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "material_density must be positive, got {}",
                self.material_density
            )));
        }
        if self.net && self.net_thickness == 0 {
            return Err(PipelineError::InvalidConfig(
                "net_thickness must be at least 1 voxel in net mode".to_string(),
            ));
        }
        Ok(source)
    }

    /// Base name of exported artifacts, before the `_Voronoi` suffix
    pub fn stem(&self) -> String {
        if let Some(name) = &self.output_name {
            return name.clone();
        }
        if self.file_name.is_empty() {
            return self.primitive_type.clone();
        }
        Path::new(&self.file_name)
            .file_stem()
            .map_or_else(|| self.file_name.clone(), |s| s.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert!(config.model);
        assert!(!config.support);
        assert!(config.separate_supports);
        assert!(config.smooth);
        assert_eq!(config.net_thickness, 4);
        assert_eq!(config.buffer, 4);
        assert_eq!(config.block_size, 8);
        assert_eq!(config.resolution, 300);
        assert_eq!(config.aesthetic_shell, 5);
        assert!((config.material_density - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "support": true, "primitive_type": "Silo", "resolution": 64 }"#,
        )
        .unwrap();
        assert!(config.support);
        assert!(config.model);
        assert_eq!(config.resolution, 64);
        assert_eq!(config.primitive_type, "Silo");
        assert_eq!(config.output_dir, PathBuf::from("Output"));
    }

    #[test]
    fn json_round_trip() {
        let config = PipelineConfig::default()
            .with_primitive(Primitive::Egg)
            .with_output_name("egg_run");
        let json = config.to_json_pretty().unwrap();
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn missing_target_is_checked_first() {
        let config = PipelineConfig::default().with_targets(false, false);
        assert!(matches!(config.validate(), Err(PipelineError::NoTarget)));
    }

    #[test]
    fn source_resolution() {
        let config = PipelineConfig::default();
        assert!(matches!(config.validate(), Err(PipelineError::NoSource)));

        let config = PipelineConfig {
            primitive_type: "Torus".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::UnknownPrimitive(tag)) if tag == "Torus"
        ));

        let config = PipelineConfig::default().with_primitive(Primitive::Heart);
        assert_eq!(config.validate().unwrap(), Source::Primitive(Primitive::Heart));

        let config = PipelineConfig::default()
            .with_input_dir("/nonexistent/latticework")
            .with_file("bunny.binvox");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PipelineError::SourceNotFound(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let config = PipelineConfig::default()
            .with_primitive(Primitive::Cube)
            .with_block_size(0);
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));

        let config = PipelineConfig::default()
            .with_primitive(Primitive::Cube)
            .with_resolution(1);
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn stem_prefers_output_name_then_file_then_primitive() {
        let config = PipelineConfig::default().with_primitive(Primitive::Sphere);
        assert_eq!(config.stem(), "Sphere");
        let config = config.with_file("part.binvox");
        assert_eq!(config.stem(), "part");
        let config = config.with_output_name("custom");
        assert_eq!(config.stem(), "custom");
    }
}
