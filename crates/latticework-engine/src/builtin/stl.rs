//! Binary STL export of voxel boundaries
//!
//! Every face between a solid cell and an empty (or out-of-grid) neighbour
//! becomes two triangles, scaled to millimetres by the Scale Vector.
//!
//! Binary STL format:
//! - 80 bytes: Header
//! - 4 bytes: Number of triangles (u32 little-endian)
//! - For each triangle (50 bytes):
//!   - 12 bytes: Normal vector (3 x f32 little-endian)
//!   - 36 bytes: 3 vertices (9 x f32 little-endian)
//!   - 2 bytes: Attribute byte count (0)

use crate::collaborators::MeshExporter;
use crate::error::{PipelineError, Result};
use glam::{IVec3, Vec3};
use latticework_core::VoxelField;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// A cell face: outward normal and its corners counter-clockwise seen from
/// outside, as offsets within the unit cell
struct Face {
    normal: IVec3,
    corners: [IVec3; 4],
}

static FACES: [Face; 6] = [
    Face {
        normal: IVec3::X,
        corners: [IVec3::new(1, 0, 0), IVec3::new(1, 1, 0), IVec3::new(1, 1, 1), IVec3::new(1, 0, 1)],
    },
    Face {
        normal: IVec3::NEG_X,
        corners: [IVec3::new(0, 0, 0), IVec3::new(0, 0, 1), IVec3::new(0, 1, 1), IVec3::new(0, 1, 0)],
    },
    Face {
        normal: IVec3::Y,
        corners: [IVec3::new(0, 1, 0), IVec3::new(0, 1, 1), IVec3::new(1, 1, 1), IVec3::new(1, 1, 0)],
    },
    Face {
        normal: IVec3::NEG_Y,
        corners: [IVec3::new(0, 0, 0), IVec3::new(1, 0, 0), IVec3::new(1, 0, 1), IVec3::new(0, 0, 1)],
    },
    Face {
        normal: IVec3::Z,
        corners: [IVec3::new(0, 0, 1), IVec3::new(1, 0, 1), IVec3::new(1, 1, 1), IVec3::new(0, 1, 1)],
    },
    Face {
        normal: IVec3::NEG_Z,
        corners: [IVec3::new(0, 0, 0), IVec3::new(0, 1, 0), IVec3::new(1, 1, 0), IVec3::new(1, 0, 0)],
    },
];

/// One output triangle: normal then three vertices
type Triangle = [Vec3; 4];

/// Collect the boundary triangles of the solid in `field`
pub fn boundary_triangles(field: &VoxelField, scale: Vec3) -> Vec<Triangle> {
    let solid = |p: IVec3| field.get_checked(p).is_some_and(|v| v <= 0.0);
    (0..field.cell_count())
        .into_par_iter()
        .filter(|&idx| field.data()[idx] <= 0.0)
        .flat_map_iter(|idx| {
            let cell = field.position(idx).as_ivec3();
            FACES
                .iter()
                .filter(move |face| !solid(cell + face.normal))
                .flat_map(move |face| {
                    let [a, b, c, d] = face.corners.map(|k| (cell + k).as_vec3() * scale);
                    let n = face.normal.as_vec3();
                    [[n, a, b, c], [n, a, c, d]]
                })
        })
        .collect()
}

/// Write triangles as binary STL
pub fn write_stl(triangles: &[Triangle], path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let header = format!("Latticework STL Export - {} triangles", triangles.len());
    let mut header_bytes = [b' '; 80];
    let header_len = header.len().min(80);
    header_bytes[..header_len].copy_from_slice(&header.as_bytes()[..header_len]);
    writer.write_all(&header_bytes)?;

    writer.write_all(&(triangles.len() as u32).to_le_bytes())?;
    for triangle in triangles {
        for v in triangle {
            for c in v.to_array() {
                writer.write_all(&c.to_le_bytes())?;
            }
        }
        writer.write_all(&0u16.to_le_bytes())?;
    }

    writer.flush()
}

/// Mesh exporter writing `<output_dir>/<name>.stl`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StlExporter {
    output_dir: PathBuf,
}

impl StlExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.stl"))
    }
}

impl MeshExporter for StlExporter {
    fn export(&self, field: &VoxelField, scale: Vec3, name: &str) -> Result<()> {
        let triangles = boundary_triangles(field, scale);
        let path = self.path_for(name);
        write_stl(&triangles, &path)
            .map_err(|e| PipelineError::Export(format!("{}: {e}", path.display())))?;
        info!("Wrote {} ({} triangles)", path.display(), triangles.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec3;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("latticework_stl_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn single_voxel_is_a_cube() {
        let mut field = VoxelField::filled(UVec3::splat(3), 1.0);
        field.set(UVec3::ONE, -1.0);
        let triangles = boundary_triangles(&field, Vec3::new(2.0, 1.0, 1.0));
        assert_eq!(triangles.len(), 12);

        for [n, a, b, c] in &triangles {
            // Winding agrees with the stored normal
            let cross = (*b - *a).cross(*c - *a);
            assert!(cross.normalize().dot(*n) > 0.99);
        }
        let max_x = triangles
            .iter()
            .flat_map(|t| t[1..].iter().map(|v| v.x))
            .fold(f32::MIN, f32::max);
        assert_eq!(max_x, 4.0);
    }

    #[test]
    fn shared_faces_are_dropped() {
        let field = VoxelField::filled(UVec3::new(2, 1, 1), -1.0);
        // Two cells touching along X: 10 outer faces
        assert_eq!(boundary_triangles(&field, Vec3::ONE).len(), 20);
    }

    #[test]
    fn exported_file_has_expected_size() {
        let dir = temp_dir("cube");
        let mut field = VoxelField::filled(UVec3::splat(3), 1.0);
        field.set(UVec3::ONE, -1.0);

        let exporter = StlExporter::new(&dir);
        exporter.export(&field, Vec3::ONE, "cube").unwrap();

        // 80 (header) + 4 (count) + 50 * 12 triangles
        let metadata = std::fs::metadata(exporter.path_for("cube")).unwrap();
        assert_eq!(metadata.len(), 684);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_an_export_error() {
        let exporter = StlExporter::new("/nonexistent/latticework/out");
        let field = VoxelField::filled(UVec3::ONE, -1.0);
        assert!(matches!(
            exporter.export(&field, Vec3::ONE, "x"),
            Err(PipelineError::Export(_))
        ));
    }
}
