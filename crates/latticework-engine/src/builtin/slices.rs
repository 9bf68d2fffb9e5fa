//! PNG slice plots and image stacks
//!
//! Everything here is diagnostic output. Write failures are logged and
//! dropped so a broken output directory never stops a run.

use crate::collaborators::SliceVisualizer;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use latticework_core::{Axis, Slice, VoxelField};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BACKGROUND: [u8; 3] = [255, 255, 255];

/// Slice visualizer saving PNG files under an output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngSliceVisualizer {
    output_dir: PathBuf,
}

impl PngSliceVisualizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// File a plot of `axis` slice `index` titled `title` is written to
    pub fn plot_path(&self, title: &str, axis: Axis, index: u32) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}{index}.png", file_safe(title), axis.name()))
    }

    /// Directory holding the image stack called `name`
    pub fn stack_dir(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{}_stack", file_safe(name)))
    }

    fn save(image: DynamicImage, path: &Path) {
        match image.save(path) {
            Ok(()) => debug!("Saved {}", path.display()),
            Err(e) => warn!("Could not save {}: {e}", path.display()),
        }
    }
}

impl SliceVisualizer for PngSliceVisualizer {
    fn slice_plot(&self, field: &VoxelField, axis: Axis, index: u32, title: &str) {
        let Some(slice) = field.slice(axis, index) else {
            warn!("{title}: slice {index} is outside the field along {}", axis.name());
            return;
        };
        Self::save(shade(&slice, axis).into(), &self.plot_path(title, axis, index));
    }

    fn contour_plot(&self, field: &VoxelField, axis: Axis, index: u32, title: &str) {
        let Some(slice) = field.slice(axis, index) else {
            warn!("{title}: slice {index} is outside the field along {}", axis.name());
            return;
        };
        let path = self.plot_path(&format!("{title}_contour"), axis, index);
        Self::save(contour(&slice, axis).into(), &path);
    }

    fn image_stack(
        &self,
        first: &VoxelField,
        first_color: [u8; 3],
        second: &VoxelField,
        second_color: [u8; 3],
        name: &str,
    ) {
        if !first.same_shape(second) {
            warn!("{name}: image stack fields differ in shape, skipping");
            return;
        }
        let dir = self.stack_dir(name);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Could not create {}: {e}", dir.display());
            return;
        }
        let dims = first.dims();
        for x in 0..dims.x {
            let (a, b) = (first.slice_x(x), second.slice_x(x));
            let image = RgbImage::from_fn(dims.z, dims.y, |col, row| {
                let idx = (row * dims.z + col) as usize;
                let color = if a[idx] <= 0.0 {
                    first_color
                } else if b[idx] <= 0.0 {
                    second_color
                } else {
                    BACKGROUND
                };
                Rgb(color)
            });
            Self::save(image.into(), &dir.join(format!("{}_{x:04}.png", file_safe(name))));
        }
    }
}

/// Image row for slice row `row`; slices containing X are flipped so the
/// build plate is at the bottom
fn image_row(slice: &Slice, axis: Axis, row: u32) -> u32 {
    match axis {
        Axis::X => row,
        Axis::Y | Axis::Z => slice.height - 1 - row,
    }
}

/// Grayscale plot, darkest at the deepest interior value
fn shade(slice: &Slice, axis: Axis) -> GrayImage {
    let lo = slice.values.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = slice.values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = (hi - lo).max(f32::EPSILON);
    let mut image = GrayImage::new(slice.width, slice.height);
    for row in 0..slice.height {
        for col in 0..slice.width {
            let t = (slice.get(col, row) - lo) / span;
            let level = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
            image.put_pixel(col, image_row(slice, axis, row), Luma([level]));
        }
    }
    image
}

/// Black where the sign changes towards the next column or row
fn contour(slice: &Slice, axis: Axis) -> GrayImage {
    let solid = |col: u32, row: u32| slice.get(col, row) <= 0.0;
    let mut image = GrayImage::from_pixel(slice.width, slice.height, Luma([255]));
    for row in 0..slice.height {
        for col in 0..slice.width {
            let here = solid(col, row);
            let edge = (col + 1 < slice.width && solid(col + 1, row) != here)
                || (row + 1 < slice.height && solid(col, row + 1) != here);
            if edge {
                image.put_pixel(col, image_row(slice, axis, row), Luma([0]));
            }
        }
    }
    image
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
