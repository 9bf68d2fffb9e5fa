//! Fabrication pipeline orchestrator
//!
//! One run, in order:
//! 1. validate the configuration (nothing is computed or written on failure)
//! 2. voxelize the input file or evaluate the primitive
//! 3. condense and rebuild an exact SDF, hollowed in net mode
//! 4. support branch: drop region, support region, seeds from the height map,
//!    lattice, optional perforation, base table
//! 5. model branch: seeds from the SDF (or its shell), lattice, aesthetic infill
//! 6. combine, plot, smooth and export
//!
//! A branch whose geometry comes out empty is skipped with a warning; the rest
//! of the run goes on.

use crate::collaborators::{Collaborators, LatticeRequest};
use crate::config::{PipelineConfig, Source};
use crate::error::Result;
use crate::support;
use glam::{UVec3, Vec3};
use latticework_core::{Axis, Kernel, MaterialReport, Metric, VoxelField};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Z slice the support contour is drawn at
const SUPPORT_CONTOUR_SLICE: u32 = 30;

const MODEL_COLOR: [u8; 3] = [255, 0, 0];
const SUPPORT_COLOR: [u8; 3] = [0, 0, 255];
const NO_COLOR: [u8; 3] = [0, 0, 0];

/// Which part of the output a report entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Model,
    Support,
    Inverse,
}

impl Branch {
    pub fn name(self) -> &'static str {
        match self {
            Branch::Model => "model",
            Branch::Support => "support",
            Branch::Inverse => "inverse",
        }
    }
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Shape of the source grid before condensing
    pub initial_dims: UVec3,
    /// Shape every later field shares
    pub condensed_dims: UVec3,
    /// mm per voxel
    pub scale: Vec3,
    pub model: Option<MaterialReport>,
    pub support: Option<MaterialReport>,
    /// Branches dropped because their geometry came out empty
    pub skipped: Vec<Branch>,
    /// Names handed to the exporter, in order
    pub artifacts: Vec<String>,
}

/// Drives one fabrication run over a set of collaborators
pub struct Pipeline {
    collaborators: Collaborators,
}

impl Pipeline {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Execute `config` from source to export
    pub fn run(&self, config: &PipelineConfig) -> Result<PipelineReport> {
        let start = Instant::now();
        let source = config.validate()?;
        let kernel = Kernel::new(config.block_size);

        if let Err(e) = std::fs::create_dir_all(&config.output_dir) {
            warn!("Could not create {}: {e}", config.output_dir.display());
        }

        let (field, scale) = self.resolve(&kernel, config, &source)?;
        let initial_dims = field.dims();
        info!("Initial bounding box dimensions: {initial_dims}");

        let condensed = kernel.condense(&field, config.buffer)?;
        drop(field);
        let mut sdf = kernel.signed_distance(&condensed.field, Metric::Euclidean);
        if config.net {
            sdf = support::net_model(&kernel, &sdf, config.net_thickness);
        }
        let condensed_dims = sdf.dims();
        info!("Condensed bounding box dimensions: {condensed_dims}");
        debug!("Scale vector: {scale} mm per voxel");

        let mut report = PipelineReport {
            initial_dims,
            condensed_dims,
            scale,
            model: None,
            support: None,
            skipped: Vec::new(),
            artifacts: Vec::new(),
        };

        let support_lattice = if config.support {
            self.build_support(&kernel, config, &sdf, scale, &mut report)?
        } else {
            None
        };
        let model_lattice = if config.model {
            self.build_model(&kernel, config, &sdf, scale, &mut report)?
        } else {
            None
        };

        let stem = format!("{}_Voronoi", config.stem());
        let complete = match (&model_lattice, &support_lattice) {
            (Some(model), Some(support)) => {
                if config.image_stack {
                    self.collaborators.visualizer.image_stack(
                        model,
                        MODEL_COLOR,
                        support,
                        SUPPORT_COLOR,
                        &stem,
                    );
                }
                Some(kernel.union(model, support)?)
            }
            (None, Some(support)) => {
                if config.image_stack {
                    self.collaborators.visualizer.image_stack(
                        support,
                        NO_COLOR,
                        support,
                        SUPPORT_COLOR,
                        &stem,
                    );
                }
                Some(support.clone())
            }
            (Some(model), None) => {
                if config.image_stack {
                    self.collaborators.visualizer.image_stack(
                        model,
                        MODEL_COLOR,
                        model,
                        NO_COLOR,
                        &stem,
                    );
                }
                Some(model.clone())
            }
            (None, None) => None,
        };

        let Some(complete) = complete else {
            warn!("Every requested branch came out empty, nothing to export");
            return Ok(report);
        };
        for axis in Axis::ALL {
            let mid = complete.dims().to_array()[axis.index()] / 2;
            self.collaborators
                .visualizer
                .slice_plot(&complete, axis, mid, "Full Model");
        }
        info!("That took {:.2} seconds", start.elapsed().as_secs_f64());

        if config.export {
            self.export_all(
                &kernel,
                config,
                &stem,
                &sdf,
                &complete,
                model_lattice.as_ref(),
                support_lattice.as_ref(),
                &mut report,
            )?;
        }
        Ok(report)
    }

    /// Source field and Scale Vector
    fn resolve(
        &self,
        kernel: &Kernel,
        config: &PipelineConfig,
        source: &Source,
    ) -> Result<(VoxelField, Vec3)> {
        match source {
            Source::File(path) => {
                let resolution = config.resolution - 2 * config.buffer;
                let mesh = self.collaborators.voxelizer.voxelize(
                    kernel,
                    path,
                    resolution,
                    config.buffer,
                )?;
                let inner = mesh
                    .field
                    .dims()
                    .saturating_sub(UVec3::splat(2 * config.buffer))
                    .max(UVec3::ONE)
                    .as_vec3();
                let sx = mesh.extents.x / inner.x;
                let syz = mesh.extents.y.max(mesh.extents.z) / inner.y;
                Ok((mesh.field, Vec3::new(sx, syz, syz)))
            }
            Source::Primitive(primitive) => {
                info!("Building primitive {primitive}");
                let field = primitive.build(kernel, config.resolution)?;
                let scale = primitive.coord_grid(config.resolution).spacing();
                Ok((field, scale))
            }
        }
    }

    fn build_support(
        &self,
        kernel: &Kernel,
        config: &PipelineConfig,
        sdf: &VoxelField,
        scale: Vec3,
        report: &mut PipelineReport,
    ) -> Result<Option<VoxelField>> {
        let dropped = support::drop_region(kernel, sdf);
        let region = support::support_region(kernel, sdf, &dropped)?;
        if region.is_vacant() {
            warn!("Model needs no support, skipping the support branch");
            report.skipped.push(Branch::Support);
            return Ok(None);
        }
        let contour_z = SUPPORT_CONTOUR_SLICE.min(region.dims().z - 1);
        self.collaborators
            .visualizer
            .contour_plot(&region, Axis::Z, contour_z, "Support");

        let heights = kernel.x_height(&region);
        let points = self
            .collaborators
            .sampler
            .sample(&heights, config.support_threshold);
        debug!("Support seeds: {}", points.len());

        let mut lattice = self.collaborators.synthesizer.synthesize(
            kernel,
            &LatticeRequest {
                base: &region,
                seeds: &points,
                cell_size: config.support_cell,
                shell_count: 0,
                scale,
                name: "Support",
            },
        )?;
        if config.perforate {
            let holes = support::perforation(kernel, region.dims(), &points)?;
            lattice = kernel.subtract(&holes, &lattice)?;
        }
        let table = support::table(kernel, sdf, &dropped)?;
        let lattice = kernel.union(&table, &lattice)?;
        if lattice.is_vacant() {
            warn!("Support lattice is empty, skipping the support branch");
            report.skipped.push(Branch::Support);
            return Ok(None);
        }

        let material = kernel.material_report(&lattice, scale, config.material_density);
        info!(
            "Support: {:.1} mm^3, {:.2} g",
            material.volume_mm3, material.mass_g
        );
        report.support = Some(material);
        Ok(Some(lattice))
    }

    fn build_model(
        &self,
        kernel: &Kernel,
        config: &PipelineConfig,
        sdf: &VoxelField,
        scale: Vec3,
        report: &mut PipelineReport,
    ) -> Result<Option<VoxelField>> {
        let aesthetic_shell = config.aesthetic_shell as f32;
        let points = if config.aesthetic {
            let band = kernel.shell(sdf, aesthetic_shell);
            self.collaborators
                .sampler
                .sample(&band, config.model_threshold)
        } else {
            self.collaborators.sampler.sample(sdf, config.model_threshold)
        };
        info!("Points generated: {}", points.len());

        let mut lattice = self.collaborators.synthesizer.synthesize(
            kernel,
            &LatticeRequest {
                base: sdf,
                seeds: &points,
                cell_size: config.model_cell,
                shell_count: config.model_shell,
                scale,
                name: "Object",
            },
        )?;
        if lattice.is_vacant() {
            warn!("Model lattice is empty, skipping the model branch");
            report.skipped.push(Branch::Model);
            return Ok(None);
        }

        let material = kernel.material_report(&lattice, scale, config.material_density);
        info!(
            "Object: {:.1} mm^3, {:.2} g",
            material.volume_mm3, material.mass_g
        );
        report.model = Some(material);

        if config.aesthetic {
            let core = kernel.thicken(sdf, -aesthetic_shell);
            lattice = kernel.union(&lattice, &core)?;
        }
        Ok(Some(lattice))
    }

    fn export_all(
        &self,
        kernel: &Kernel,
        config: &PipelineConfig,
        stem: &str,
        sdf: &VoxelField,
        complete: &VoxelField,
        model: Option<&VoxelField>,
        support: Option<&VoxelField>,
        report: &mut PipelineReport,
    ) -> Result<()> {
        let finish = |field: &VoxelField| {
            if config.smooth {
                kernel.smooth(field, config.smooth_iterations, config.buffer)
            } else {
                field.clone()
            }
        };
        let scale = report.scale;
        let mut artifacts = Vec::new();
        let mut export = |field: &VoxelField, name: String| -> Result<()> {
            info!("Generating mesh {name}");
            self.collaborators
                .exporter
                .export(&finish(field), scale, &name)?;
            artifacts.push(name);
            Ok(())
        };

        match (model, support) {
            (Some(model), Some(support)) if config.separate_supports => {
                export(model, stem.to_string())?;
                export(support, format!("{stem}Support"))?;
            }
            _ => export(complete, stem.to_string())?,
        }

        if config.inverse
            && let Some(model) = model
        {
            let inverse = kernel.subtract(model, sdf)?;
            if inverse.is_vacant() {
                warn!("Inverse is empty, skipping it");
                report.skipped.push(Branch::Inverse);
            } else {
                export(&inverse, format!("{stem}Inv"))?;
            }
        }
        report.artifacts.extend(artifacts);
        Ok(())
    }
}
