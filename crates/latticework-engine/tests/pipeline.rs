//! End-to-end pipeline runs with recording collaborators

use approx::assert_relative_eq;
use glam::{UVec3, Vec3};
use latticework_core::{Axis, Kernel, Metric, Primitive, VoxelField};
use latticework_engine::builtin::HashSampler;
use latticework_engine::{
    Branch, Collaborators, LatticeRequest, LatticeSynthesizer, MeshExporter, Pipeline,
    PipelineConfig, PipelineError, PointSampler, Result, SliceVisualizer, VoxelizedMesh,
    Voxelizer,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;
type Fields = Arc<Mutex<Vec<(String, VoxelField)>>>;

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn captured(fields: &Fields, name: &str) -> VoxelField {
    fields
        .lock()
        .unwrap()
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, f)| f.clone())
        .unwrap_or_else(|| panic!("nothing captured under {name}"))
}

/// Flat index of the deepest cell of the condensed sphere SDF for `config`
fn sphere_centre(config: &PipelineConfig) -> usize {
    let kernel = Kernel::new(config.block_size);
    let solid = Primitive::Sphere.build(&kernel, config.resolution).unwrap();
    let condensed = kernel.condense(&solid, config.buffer).unwrap();
    let sdf = kernel.signed_distance(&condensed.field, Metric::Euclidean);
    let deepest = sdf.min_value();
    sdf.data().iter().position(|&v| v == deepest).unwrap()
}

struct RecordingExporter(Log);

impl MeshExporter for RecordingExporter {
    fn export(&self, field: &VoxelField, _scale: Vec3, name: &str) -> Result<()> {
        assert!(!field.is_vacant(), "{name} exported empty");
        self.0.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

struct CapturingExporter(Fields);

impl MeshExporter for CapturingExporter {
    fn export(&self, field: &VoxelField, _scale: Vec3, name: &str) -> Result<()> {
        self.0.lock().unwrap().push((name.to_string(), field.clone()));
        Ok(())
    }
}

struct RecordingVisualizer(Log);

impl SliceVisualizer for RecordingVisualizer {
    fn slice_plot(&self, field: &VoxelField, axis: Axis, index: u32, title: &str) {
        assert!(index < field.dims().to_array()[axis.index()]);
        self.0
            .lock()
            .unwrap()
            .push(format!("slice {title} {}{index}", axis.name()));
    }

    fn contour_plot(&self, _field: &VoxelField, axis: Axis, index: u32, title: &str) {
        self.0
            .lock()
            .unwrap()
            .push(format!("contour {title} {}{index}", axis.name()));
    }

    fn image_stack(
        &self,
        _first: &VoxelField,
        _first_color: [u8; 3],
        _second: &VoxelField,
        _second_color: [u8; 3],
        name: &str,
    ) {
        self.0.lock().unwrap().push(format!("stack {name}"));
    }
}

/// Every fifth cell of the region
struct StrideSampler;

impl PointSampler for StrideSampler {
    fn sample(&self, field: &VoxelField, threshold: f32) -> Vec<UVec3> {
        (0..field.cell_count())
            .filter(|&idx| field.data()[idx] <= -threshold)
            .step_by(5)
            .map(|idx| field.position(idx))
            .collect()
    }
}

/// Lattice is a four-voxel band inside the base
struct ShellSynthesizer;

impl LatticeSynthesizer for ShellSynthesizer {
    fn synthesize(&self, kernel: &Kernel, request: &LatticeRequest<'_>) -> Result<VoxelField> {
        Ok(kernel.shell(request.base, 4.0))
    }
}

/// Same band as [`ShellSynthesizer`], keeping every base it is handed
struct CapturingSynthesizer(Fields);

impl LatticeSynthesizer for CapturingSynthesizer {
    fn synthesize(&self, kernel: &Kernel, request: &LatticeRequest<'_>) -> Result<VoxelField> {
        self.0
            .lock()
            .unwrap()
            .push((request.name.to_string(), request.base.clone()));
        Ok(kernel.shell(request.base, 4.0))
    }
}

struct EmptySynthesizer;

impl LatticeSynthesizer for EmptySynthesizer {
    fn synthesize(&self, _kernel: &Kernel, request: &LatticeRequest<'_>) -> Result<VoxelField> {
        Ok(VoxelField::filled(request.base.dims(), 1.0))
    }
}

/// Solid box twice as long in X as in Y and Z, 40 x 20 x 20 mm
struct BoxVoxelizer(Arc<Mutex<Option<u32>>>);

impl Voxelizer for BoxVoxelizer {
    fn voxelize(
        &self,
        _kernel: &Kernel,
        _path: &Path,
        resolution: u32,
        buffer: u32,
    ) -> Result<VoxelizedMesh> {
        *self.0.lock().unwrap() = Some(resolution);
        let inner = UVec3::new(resolution, resolution / 2, resolution / 2);
        let dims = inner + UVec3::splat(2 * buffer);
        let mut field = VoxelField::filled(dims, 1.0);
        for idx in 0..field.cell_count() {
            let p = field.position(idx);
            if p.cmpge(UVec3::splat(buffer)).all() && p.cmplt(inner + UVec3::splat(buffer)).all() {
                field.set(p, -1.0);
            }
        }
        Ok(VoxelizedMesh {
            field,
            extents: Vec3::new(40.0, 20.0, 20.0),
        })
    }
}

struct Harness {
    exports: Log,
    plots: Log,
    out: PathBuf,
}

impl Harness {
    fn new(name: &str) -> Self {
        let out = std::env::temp_dir().join(format!("latticework_pipeline_{name}"));
        let _ = std::fs::remove_dir_all(&out);
        Self {
            exports: Log::default(),
            plots: Log::default(),
            out,
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators::builtin(&self.out)
            .with_sampler(StrideSampler)
            .with_synthesizer(ShellSynthesizer)
            .with_exporter(RecordingExporter(Arc::clone(&self.exports)))
            .with_visualizer(RecordingVisualizer(Arc::clone(&self.plots)))
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.collaborators())
    }

    /// Pipeline whose exporter and synthesizer keep the fields they see
    fn capturing(&self) -> (Pipeline, Fields, Fields) {
        let exports = Fields::default();
        let bases = Fields::default();
        let pipeline = Pipeline::new(
            self.collaborators()
                .with_exporter(CapturingExporter(Arc::clone(&exports)))
                .with_synthesizer(CapturingSynthesizer(Arc::clone(&bases))),
        );
        (pipeline, exports, bases)
    }

    fn sphere(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_primitive(Primitive::Sphere)
            .with_resolution(24)
            .with_output_dir(&self.out)
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.out);
    }
}

#[test]
fn no_target_is_a_config_error_with_no_output() {
    let h = Harness::new("no_target");
    let config = h.sphere().with_targets(false, false);

    let err = h.pipeline().run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::NoTarget));
    assert!(err.is_config_error());
    assert!(!h.out.exists());
    assert!(entries(&h.exports).is_empty());
    assert!(entries(&h.plots).is_empty());
}

#[test]
fn unknown_primitive_aborts_before_any_work() {
    let h = Harness::new("unknown_primitive");
    let config = PipelineConfig {
        primitive_type: "Dodecahedron".to_string(),
        ..h.sphere()
    };
    let err = h.pipeline().run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::UnknownPrimitive(tag) if tag == "Dodecahedron"));
    assert!(!h.out.exists());
}

#[test]
fn missing_input_file_is_reported() {
    let h = Harness::new("missing_input");
    let config = h
        .sphere()
        .with_input_dir(h.out.join("Input"))
        .with_file("missing.binvox");
    let err = h.pipeline().run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::SourceNotFound(path) if path.ends_with("missing.binvox")));
    assert!(!h.out.exists());
}

#[test]
fn model_only_run_exports_one_artifact() {
    let h = Harness::new("model_only");
    let config = h.sphere();
    let report = h.pipeline().run(&config).unwrap();

    assert_eq!(entries(&h.exports), vec!["Sphere_Voronoi"]);
    assert_eq!(report.artifacts, vec!["Sphere_Voronoi"]);
    assert_eq!(report.initial_dims, UVec3::splat(24));
    assert_eq!(report.condensed_dims % 8, UVec3::ZERO);
    assert_relative_eq!(report.scale.x, 100.0 / 23.0, epsilon = 1e-4);
    assert!(report.model.is_some_and(|m| m.volume_mm3 > 0.0));
    assert!(report.support.is_none());
    assert!(report.skipped.is_empty());
    assert!(h.out.is_dir());

    let plots = entries(&h.plots);
    let slices: Vec<_> = plots.iter().filter(|p| p.starts_with("slice")).collect();
    assert_eq!(slices.len(), 3);
}

#[test]
fn model_and_separate_supports_export_two_artifacts() {
    let h = Harness::new("separate_supports");
    let config = h.sphere().with_targets(true, true);
    let report = h.pipeline().run(&config).unwrap();

    assert_eq!(
        entries(&h.exports),
        vec!["Sphere_Voronoi", "Sphere_VoronoiSupport"]
    );
    assert!(report.support.is_some_and(|s| s.mass_g > 0.0));
    assert!(entries(&h.plots).iter().any(|p| p.starts_with("contour Support z")));
}

#[test]
fn combined_supports_export_one_artifact() {
    let h = Harness::new("combined_supports");
    let config = PipelineConfig {
        separate_supports: false,
        ..h.sphere().with_targets(true, true)
    };
    let report = h.pipeline().run(&config).unwrap();
    assert_eq!(report.artifacts, vec!["Sphere_Voronoi"]);
    assert!(report.model.is_some() && report.support.is_some());
}

#[test]
fn inverse_adds_a_mold_artifact() {
    let h = Harness::new("inverse");
    let config = PipelineConfig {
        inverse: true,
        smooth: false,
        ..h.sphere()
    };
    let report = h.pipeline().run(&config).unwrap();
    assert_eq!(report.artifacts, vec!["Sphere_Voronoi", "Sphere_VoronoiInv"]);
}

#[test]
fn empty_lattice_skips_the_branch() {
    let h = Harness::new("empty_lattice");
    let pipeline = Pipeline::new(h.collaborators().with_synthesizer(EmptySynthesizer));
    let report = pipeline.run(&h.sphere()).unwrap();

    assert_eq!(report.skipped, vec![Branch::Model]);
    assert!(report.model.is_none());
    assert!(entries(&h.exports).is_empty());
}

#[test]
fn export_can_be_disabled() {
    let h = Harness::new("no_export");
    let report = h.pipeline().run(&h.sphere().with_export(false)).unwrap();
    assert!(report.artifacts.is_empty());
    assert!(report.model.is_some());
    assert!(entries(&h.exports).is_empty());
}

#[test]
fn image_stack_is_requested_under_the_artifact_stem() {
    let h = Harness::new("image_stack");
    let config = PipelineConfig {
        image_stack: true,
        ..h.sphere().with_output_name("ball")
    };
    let report = h.pipeline().run(&config).unwrap();
    assert_eq!(report.artifacts, vec!["ball_Voronoi"]);
    assert!(entries(&h.plots).contains(&"stack ball_Voronoi".to_string()));
}

#[test]
fn file_source_scale_comes_from_extents() {
    let h = Harness::new("file_source");
    let input = h.out.join("Input");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("block.binvox"), b"").unwrap();

    let seen = Arc::new(Mutex::new(None));
    let pipeline = Pipeline::new(
        h.collaborators()
            .with_voxelizer(BoxVoxelizer(Arc::clone(&seen))),
    );
    let config = h
        .sphere()
        .with_input_dir(&input)
        .with_file("block.binvox")
        .with_buffer(2);
    let report = pipeline.run(&config).unwrap();

    assert_eq!(*seen.lock().unwrap(), Some(20));
    assert_relative_eq!(report.scale.x, 2.0);
    assert_relative_eq!(report.scale.y, 2.0);
    assert_relative_eq!(report.scale.z, 2.0);
    assert_eq!(report.artifacts, vec!["block_Voronoi"]);
}

#[test]
fn builtin_collaborators_run_end_to_end() {
    let h = Harness::new("builtin");
    let pipeline = Pipeline::new(
        Collaborators::builtin(&h.out).with_sampler(HashSampler::new(0.05, 1)),
    );
    let config = h.sphere().with_resolution(20).with_smoothing(false);
    let report = pipeline.run(&config).unwrap();

    assert_eq!(report.artifacts, vec!["Sphere_Voronoi"]);
    let stl = h.out.join("Sphere_Voronoi.stl");
    let size = std::fs::metadata(&stl).unwrap().len();
    assert!(size > 84);
    assert_eq!((size - 84) % 50, 0);
    let plots: Vec<String> = std::fs::read_dir(&h.out)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("Full_Model_") && name.ends_with(".png"))
        .collect();
    assert_eq!(plots.len(), 3);
}

#[test]
fn flat_bottomed_model_skips_the_support_branch() {
    let h = Harness::new("cube_support");
    let config = PipelineConfig::default()
        .with_primitive(Primitive::Cube)
        .with_resolution(24)
        .with_output_dir(&h.out)
        .with_targets(true, true);
    let report = h.pipeline().run(&config).unwrap();

    assert_eq!(report.skipped, vec![Branch::Support]);
    assert!(report.support.is_none());
    assert!(report.model.is_some());
    assert_eq!(entries(&h.exports), vec!["Cube_Voronoi"]);
    assert!(!entries(&h.plots).iter().any(|p| p.starts_with("contour")));
}

#[test]
fn aesthetic_mode_keeps_a_thinned_core() {
    let h = Harness::new("aesthetic");
    let (pipeline, exports, bases) = h.capturing();
    let plain = h.sphere().with_smoothing(false);
    let aesthetic = PipelineConfig {
        aesthetic: true,
        ..plain.clone()
    };
    let centre = sphere_centre(&plain);

    pipeline.run(&plain).unwrap();
    let lattice = captured(&exports, "Sphere_Voronoi");
    exports.lock().unwrap().clear();
    let report = pipeline.run(&aesthetic).unwrap();
    let with_core = captured(&exports, "Sphere_Voronoi");

    assert!(report.model.is_some());
    assert!(captured(&bases, "Object").data()[centre] < -5.0);
    assert!(lattice.data()[centre] > 0.0);
    assert!(with_core.data()[centre] <= 0.0);
    assert!(with_core.occupied_count() > lattice.occupied_count());
}

#[test]
fn net_mode_hollows_the_model_before_synthesis() {
    let h = Harness::new("net");
    let (pipeline, _, bases) = h.capturing();
    let config = PipelineConfig {
        net: true,
        ..h.sphere()
    };
    let centre = sphere_centre(&config);
    let report = pipeline.run(&config).unwrap();

    let base = captured(&bases, "Object");
    assert!(base.data()[centre] > 0.0);
    assert!(!base.is_vacant());
    // Nothing deeper than the net thickness survives
    assert!(base.min_value() >= -(config.net_thickness as f32));
    assert_eq!(report.artifacts, vec!["Sphere_Voronoi"]);
}

#[test]
fn perforation_only_removes_support_material() {
    let h = Harness::new("perforate");
    let (pipeline, exports, _) = h.capturing();
    let solid = h.sphere().with_targets(true, true).with_smoothing(false);
    let perforated = PipelineConfig {
        perforate: true,
        ..solid.clone()
    };

    pipeline.run(&solid).unwrap();
    let full = captured(&exports, "Sphere_VoronoiSupport");
    exports.lock().unwrap().clear();
    let report = pipeline.run(&perforated).unwrap();
    let holed = captured(&exports, "Sphere_VoronoiSupport");

    assert!(report.support.is_some());
    assert!(holed.occupied_count() < full.occupied_count());
    assert!(
        holed
            .data()
            .iter()
            .zip(full.data())
            .all(|(&h, &f)| h > 0.0 || f <= 0.0)
    );
}
