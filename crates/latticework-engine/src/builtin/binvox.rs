//! `.binvox` occupancy files
//!
//! Header lines (`#binvox 1`, `dim`, `translate`, `scale`, `data`) followed by
//! run-length encoded `(value, count)` byte pairs. Voxels are stored with Y
//! varying fastest, then Z, then X.

use crate::collaborators::{VoxelizedMesh, Voxelizer};
use crate::error::{PipelineError, Result};
use glam::{IVec3, UVec3};
use latticework_core::{Kernel, VoxelField};
use std::path::Path;
use tracing::{debug, info};

/// Decoded `.binvox` grid in x-major layout
#[derive(Debug, Clone, PartialEq)]
pub struct BinvoxGrid {
    pub dims: UVec3,
    /// Edge length of one voxel in model units
    pub voxel_size: f32,
    pub occupied: Vec<bool>,
}

impl BinvoxGrid {
    fn index(&self, p: UVec3) -> usize {
        let (ny, nz) = (self.dims.y as usize, self.dims.z as usize);
        (p.x as usize * ny + p.y as usize) * nz + p.z as usize
    }

    /// First and last occupied cell along each axis
    pub fn occupied_bounds(&self) -> Option<(UVec3, UVec3)> {
        let mut bounds: Option<(UVec3, UVec3)> = None;
        for x in 0..self.dims.x {
            for y in 0..self.dims.y {
                for z in 0..self.dims.z {
                    let p = UVec3::new(x, y, z);
                    if self.occupied[self.index(p)] {
                        bounds = Some(match bounds {
                            Some((lo, hi)) => (lo.min(p), hi.max(p)),
                            None => (p, p),
                        });
                    }
                }
            }
        }
        bounds
    }
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::Voxelize(msg.into())
}

/// Split the next header line off `bytes`
fn split_line(bytes: &[u8]) -> Result<(&str, &[u8])> {
    let end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| invalid("truncated header"))?;
    let line = std::str::from_utf8(&bytes[..end]).map_err(|_| invalid("header is not text"))?;
    Ok((line.trim(), &bytes[end + 1..]))
}

/// Decode a `.binvox` file held in memory
pub fn parse_binvox(bytes: &[u8]) -> Result<BinvoxGrid> {
    let (magic, mut rest) = split_line(bytes)?;
    if !magic.starts_with("#binvox") {
        return Err(invalid("missing #binvox magic"));
    }
    let mut raw_dims = None;
    let mut scale = 1.0f32;
    loop {
        let (line, tail) = split_line(rest)?;
        rest = tail;
        let mut words = line.split_whitespace();
        match words.next() {
            Some("dim") => {
                let d: Vec<u32> = words.filter_map(|w| w.parse().ok()).collect();
                if d.len() != 3 || d.contains(&0) {
                    return Err(invalid(format!("bad dim line '{line}'")));
                }
                raw_dims = Some([d[0], d[1], d[2]]);
            }
            Some("scale") => {
                scale = words
                    .next()
                    .and_then(|w| w.parse().ok())
                    .ok_or_else(|| invalid(format!("bad scale line '{line}'")))?;
            }
            Some("data") => break,
            _ => {}
        }
    }
    let [d0, d1, d2] = raw_dims.ok_or_else(|| invalid("missing dim line"))?;

    let total = [d0, d1, d2]
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d as usize))
        .ok_or_else(|| invalid("dims overflow"))?;
    let decoded: usize = rest.chunks_exact(2).map(|pair| pair[1] as usize).sum();
    if decoded != total {
        return Err(invalid(format!("expected {total} voxels, found {decoded}")));
    }
    let mut stored = Vec::with_capacity(total);
    for pair in rest.chunks_exact(2) {
        stored.extend(std::iter::repeat_n(pair[0] != 0, pair[1] as usize));
    }

    // Stored order is (x, z, y) with y fastest
    let (n0, n1, n2) = (d0 as usize, d1 as usize, d2 as usize);
    let mut occupied = vec![false; total];
    for x in 0..n0 {
        for z in 0..n1 {
            for y in 0..n2 {
                occupied[(x * n2 + y) * n1 + z] = stored[(x * n1 + z) * n2 + y];
            }
        }
    }
    let dims = UVec3::new(d0, d2, d1);
    Ok(BinvoxGrid {
        dims,
        voxel_size: scale / d0.max(d1).max(d2) as f32,
        occupied,
    })
}

/// Voxelizer for meshes already voxelized to `.binvox`
///
/// Crops to the occupied cells, resamples (nearest cell) so the longest axis
/// spans `resolution` cells and pads with `buffer` empty cells per side.
/// Occupied cells are `-1`, empty ones `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinvoxVoxelizer;

impl Voxelizer for BinvoxVoxelizer {
    fn voxelize(
        &self,
        kernel: &Kernel,
        path: &Path,
        resolution: u32,
        buffer: u32,
    ) -> Result<VoxelizedMesh> {
        let bytes = std::fs::read(path)?;
        let grid = parse_binvox(&bytes)?;
        let (lo, hi) = grid
            .occupied_bounds()
            .ok_or_else(|| invalid(format!("{} has no occupied voxels", path.display())))?;
        let span = hi - lo + UVec3::ONE;
        let extents = span.as_vec3() * grid.voxel_size;
        debug!("{}: {} grid, occupied span {span}", path.display(), grid.dims);

        let factor = resolution.max(1) as f32 / span.max_element() as f32;
        let inner = (span.as_vec3() * factor).round().as_uvec3().max(UVec3::ONE);
        let dims = inner + UVec3::splat(2 * buffer);

        let mut cells = vec![1.0; dims.x as usize * dims.y as usize * dims.z as usize];
        let pad = IVec3::splat(buffer as i32);
        kernel.launch(dims).cells(&mut cells, |p, _, cell| {
            let q = p.as_ivec3() - pad;
            if q.cmplt(IVec3::ZERO).any() || q.cmpge(inner.as_ivec3()).any() {
                return;
            }
            let src = ((q.as_vec3() + 0.5) / factor).floor().as_uvec3().min(span - UVec3::ONE);
            if grid.occupied[grid.index(lo + src)] {
                *cell = -1.0;
            }
        });

        info!("Voxelized {} into {dims} cells", path.display());
        Ok(VoxelizedMesh {
            field: VoxelField::from_vec(dims, cells)?,
            extents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn encode(dims: [u32; 3], scale: f32, stored: &[bool]) -> Vec<u8> {
        let mut bytes = format!(
            "#binvox 1\ndim {} {} {}\ntranslate 0 0 0\nscale {scale}\ndata\n",
            dims[0], dims[1], dims[2]
        )
        .into_bytes();
        for &v in stored {
            bytes.extend([u8::from(v), 1]);
        }
        bytes
    }

    #[test]
    fn parses_storage_order() {
        // Only stored index 1 is set: x = 0, z = 0, y = 1
        let mut stored = vec![false; 8];
        stored[1] = true;
        let grid = parse_binvox(&encode([2, 2, 2], 4.0, &stored)).unwrap();
        assert_eq!(grid.dims, UVec3::splat(2));
        assert_relative_eq!(grid.voxel_size, 2.0);
        assert!(grid.occupied[grid.index(UVec3::new(0, 1, 0))]);
        assert_eq!(grid.occupied.iter().filter(|&&v| v).count(), 1);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(parse_binvox(b"hello\n"), Err(PipelineError::Voxelize(_))));
        assert!(parse_binvox(b"#binvox 1\ndata\n").is_err());
        let short = encode([2, 2, 2], 1.0, &[true; 3]);
        assert!(parse_binvox(&short).is_err());
        let long = encode([2, 2, 2], 1.0, &[true; 9]);
        assert!(parse_binvox(&long).is_err());
    }

    #[test]
    fn huge_dims_are_rejected_without_allocating() {
        let mut bytes = b"#binvox 1\ndim 70000 70000 70000\nscale 1\ndata\n".to_vec();
        bytes.extend([1, 5]);
        assert!(matches!(parse_binvox(&bytes), Err(PipelineError::Voxelize(_))));

        let overflow = format!("#binvox 1\ndim {0} {0} {0}\ndata\n", u32::MAX);
        assert!(matches!(
            parse_binvox(overflow.as_bytes()),
            Err(PipelineError::Voxelize(msg)) if msg == "dims overflow"
        ));
    }

    #[test]
    fn voxelize_crops_resamples_and_pads() {
        // 8^3 grid with a 4^3 block at 2..6
        let mut stored = vec![false; 512];
        for x in 2..6 {
            for z in 2..6 {
                for y in 2..6 {
                    stored[(x * 8 + z) * 8 + y] = true;
                }
            }
        }
        let path = std::env::temp_dir().join("latticework_block.binvox");
        std::fs::write(&path, encode([8, 8, 8], 16.0, &stored)).unwrap();

        let k = Kernel::new(4);
        let mesh = BinvoxVoxelizer.voxelize(&k, &path, 8, 2).unwrap();
        assert_eq!(mesh.field.dims(), UVec3::splat(12));
        assert_eq!(mesh.field.occupied_count(), 512);
        assert_eq!(mesh.field.get(UVec3::splat(1)), 1.0);
        assert_eq!(mesh.field.get(UVec3::splat(2)), -1.0);
        assert_relative_eq!(mesh.extents.x, 8.0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let k = Kernel::default();
        let err = BinvoxVoxelizer
            .voxelize(&k, Path::new("/nonexistent/latticework.binvox"), 8, 1)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
