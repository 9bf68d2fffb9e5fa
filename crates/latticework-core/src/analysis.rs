//! Volume and mass of voxel models

use crate::kernel::Kernel;
use crate::VoxelField;
use glam::Vec3;
use rayon::prelude::*;

/// Material usage of a voxel model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialReport {
    /// Solid volume in mm^3
    pub volume_mm3: f64,
    /// Mass in grams
    pub mass_g: f64,
}

/// Mass in grams of `volume_mm3` of material with `density` in g/cm^3
pub fn mass(volume_mm3: f64, density: f64) -> f64 {
    density * volume_mm3 / 1000.0
}

impl Kernel {
    /// Solid volume of `a` in mm^3, given the mm-per-voxel `scale`
    pub fn volume(&self, a: &VoxelField, scale: Vec3) -> f64 {
        let occupancy = self.map(a, |u| if u > 0.0 { 0.0 } else { 1.0 });
        let count: f64 = occupancy.data().par_iter().map(|&v| f64::from(v)).sum();
        let cell_volume = f64::from(scale.x) * f64::from(scale.y) * f64::from(scale.z);
        count * cell_volume
    }

    /// Volume and mass of `a` for a material of `density` g/cm^3
    pub fn material_report(&self, a: &VoxelField, scale: Vec3, density: f64) -> MaterialReport {
        let volume_mm3 = self.volume(a, scale);
        MaterialReport {
            volume_mm3,
            mass_g: mass(volume_mm3, density),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::CoordGrid;
    use approx::assert_relative_eq;

    fn cube() -> VoxelField {
        // Cell centres at half-integers put exactly ten cells inside |x| <= 5
        let grid = CoordGrid::cube(-9.5, 9.5, 20);
        Kernel::default().rect(&grid, Vec3::splat(10.0), Vec3::ZERO)
    }

    #[test]
    fn unit_scale_cube_volume() {
        let k = Kernel::default();
        assert_relative_eq!(k.volume(&cube(), Vec3::ONE), 1000.0);
    }

    #[test]
    fn volume_scales_with_voxel_size() {
        let k = Kernel::default();
        let v = k.volume(&cube(), Vec3::new(0.5, 2.0, 1.0));
        assert_relative_eq!(v, 1000.0);
        let v = k.volume(&cube(), Vec3::splat(0.1));
        assert_relative_eq!(v, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn mass_uses_grams_per_cubic_centimetre() {
        let k = Kernel::default();
        let report = k.material_report(&cube(), Vec3::ONE, 1.25);
        assert_relative_eq!(report.volume_mm3, 1000.0);
        assert_relative_eq!(report.mass_g, 1.25);
    }
}
