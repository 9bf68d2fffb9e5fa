//! Voronoi lattice grown with the jump-flood transform

use crate::collaborators::{LatticeRequest, LatticeSynthesizer};
use crate::error::Result;
use glam::{IVec3, UVec3};
use latticework_core::{Kernel, Metric, VoxelField};
use tracing::{debug, warn};

const FACE_NEIGHBOURS: [IVec3; 6] = [
    IVec3::X,
    IVec3::NEG_X,
    IVec3::Y,
    IVec3::NEG_Y,
    IVec3::Z,
    IVec3::NEG_Z,
];

/// Lattice synthesizer labelling cells by nearest seed
///
/// Walls are the cells whose face neighbours belong to a different seed. The
/// wall mask is turned back into an SDF, thickened by the request's cell size
/// and clipped to the base solid; a non-zero shell count adds a skin of that
/// many voxels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JumpFloodVoronoi {
    pub metric: Metric,
}

impl JumpFloodVoronoi {
    pub fn new(metric: Metric) -> Self {
        Self { metric }
    }

    /// `-1` on cells bordering another seed's region, `1` elsewhere
    fn walls(&self, kernel: &Kernel, dims: UVec3, seeds: &[UVec3]) -> Result<VoxelField> {
        let mut sites = VoxelField::filled(dims, 1.0);
        for &seed in seeds.iter().filter(|s| s.cmplt(dims).all()) {
            sites.set(seed, -1.0);
        }
        let nearest = kernel.jump_flood(&sites, self.metric);
        let records = nearest.records();

        let mut mask = vec![1.0; records.len()];
        kernel.launch(dims).cells(&mut mask, |p, idx, cell| {
            let own = records[idx].seed;
            let bordering = FACE_NEIGHBOURS.iter().any(|offset| {
                let q = p.as_ivec3() + *offset;
                sites.contains(q) && records[sites.index_of(q.as_uvec3())].seed != own
            });
            if bordering {
                *cell = -1.0;
            }
        });
        Ok(VoxelField::from_vec(dims, mask)?)
    }
}

impl LatticeSynthesizer for JumpFloodVoronoi {
    fn synthesize(&self, kernel: &Kernel, request: &LatticeRequest<'_>) -> Result<VoxelField> {
        let dims = request.base.dims();
        if request.seeds.is_empty() {
            warn!("{}: no seed points, lattice is empty", request.name);
            return Ok(VoxelField::filled(dims, 1.0));
        }
        debug!(
            "{}: {} seeds, cell size {} voxels ({:.3} mm)",
            request.name,
            request.seeds.len(),
            request.cell_size,
            request.cell_size * request.scale.max_element()
        );

        let walls = self.walls(kernel, dims, request.seeds)?;
        let walls = kernel.signed_distance(&walls, self.metric);
        let walls = kernel.thicken(&walls, request.cell_size);
        let mut lattice = kernel.intersection(&walls, request.base)?;

        if request.shell_count > 0 {
            let skin = kernel.shell(request.base, request.shell_count as f32);
            lattice = kernel.union(&lattice, &skin)?;
        }
        Ok(lattice)
    }
}
