//! File-system collaborators for the batch pipeline.
//!
//! [`DirectorySource`] loads `<dir>/<identity>.<ext>`; [`DirectoryReporter`]
//! writes, per variant, the processed image `<identity>_<slug>.png` and a
//! figure `<identity>_fig_<slug>.png` (original, processed and both RGB
//! histograms), plus `<identity>_comparison_final.png` side by side.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use tracing::debug;

use crate::error::{LoadError, ReportError};
use crate::pipeline::{Artifact, ArtifactKind, ImageSource, Reporter};
use crate::raster::RasterBuffer;

/// Width of the white gap between the two halves of a comparison strip.
pub const SEPARATOR_WIDTH: u32 = 20;

const FIGURE_MARGIN: u32 = 16;
const HISTOGRAM_HEIGHT: u32 = 200;
const MIN_PLOT_WIDTH: u32 = 256;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const FRAME: Rgb<u8> = Rgb([160, 160, 160]);
const CHANNEL_COLORS: [Rgb<u8>; 3] = [Rgb([220, 40, 40]), Rgb([40, 160, 40]), Rgb([40, 80, 220])];

// ============================================================================
// Loader
// ============================================================================

/// Loads images named after their identity from one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
    extension: String,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    pub fn path_for(&self, identity: &str) -> PathBuf {
        self.dir.join(format!("{identity}.{}", self.extension))
    }
}

impl ImageSource for DirectorySource {
    fn load(&mut self, identity: &str) -> Result<RasterBuffer, LoadError> {
        let path = self.path_for(identity);
        if !path.is_file() {
            return Err(LoadError::NotFound {
                identity: identity.to_string(),
                path,
            });
        }

        let decoded = image::open(&path).map_err(|e| LoadError::Unreadable {
            identity: identity.to_string(),
            path: path.clone(),
            reason: e.to_string(),
        })?;

        debug!(identity, path = %path.display(), "Loaded image");
        Ok(RasterBuffer::from_rgb_image(&decoded.to_rgb8()))
    }
}

// ============================================================================
// Reporter
// ============================================================================

/// Writes PNG artifacts into an output directory.
#[derive(Debug, Clone)]
pub struct DirectoryReporter {
    dir: PathBuf,
}

impl DirectoryReporter {
    /// Create the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn save(&self, name: &str, img: &RgbImage) -> Result<(), ReportError> {
        let path = self.dir.join(name);
        img.save(&path)
            .map_err(|source| ReportError::Encode { path: path.clone(), source })?;
        debug!(path = %path.display(), "Wrote artifact");
        Ok(())
    }
}

impl Reporter for DirectoryReporter {
    fn report(&mut self, artifact: &Artifact<'_>) -> Result<(), ReportError> {
        match artifact.kind {
            ArtifactKind::Variant(variant) => {
                self.save(
                    &format!("{}.png", artifact.file_stem()),
                    &artifact.processed.to_rgb_image(),
                )?;
                self.save(
                    &format!("{}_fig_{}.png", artifact.identity, variant.slug()),
                    &comparison_figure(artifact.original, artifact.processed),
                )
            }
            ArtifactKind::FinalComparison => self.save(
                &format!("{}.png", artifact.file_stem()),
                &comparison_strip(artifact.original, artifact.processed),
            ),
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Original, white separator and processed image side by side.
///
/// The processed image is resized to the original's size if they differ.
pub fn comparison_strip(original: &RasterBuffer, processed: &RasterBuffer) -> RgbImage {
    let left = original.to_rgb_image();
    let (w, h) = left.dimensions();
    let mut right = processed.to_rgb_image();
    if right.dimensions() != (w, h) {
        right = imageops::resize(&right, w, h, FilterType::Triangle);
    }

    let mut canvas = RgbImage::from_pixel(2 * w + SEPARATOR_WIDTH, h, WHITE);
    imageops::overlay(&mut canvas, &left, 0, 0);
    imageops::overlay(&mut canvas, &right, (w + SEPARATOR_WIDTH) as i64, 0);
    canvas
}

/// Per-channel 256-bin histograms.
pub fn channel_histograms(image: &RasterBuffer) -> [[u32; 256]; 3] {
    let mut hist = [[0u32; 256]; 3];
    let view = image.view();
    for ((_, _, c), &v) in view.indexed_iter() {
        hist[c][v as usize] += 1;
    }
    hist
}

/// 2x2 figure: images on top, their RGB histograms below.
pub fn comparison_figure(original: &RasterBuffer, processed: &RasterBuffer) -> RgbImage {
    let plot_w = (original.width() as u32)
        .max(processed.width() as u32)
        .max(MIN_PLOT_WIDTH);
    let image_h = (original.height() as u32).max(processed.height() as u32);

    let width = 2 * plot_w + 3 * FIGURE_MARGIN;
    let height = image_h + HISTOGRAM_HEIGHT + 3 * FIGURE_MARGIN;
    let mut canvas = RgbImage::from_pixel(width, height, WHITE);

    let columns = [
        (FIGURE_MARGIN, original),
        (2 * FIGURE_MARGIN + plot_w, processed),
    ];
    let hist_y = 2 * FIGURE_MARGIN + image_h;

    for (x0, img) in columns {
        let offset = (plot_w - img.width() as u32) / 2;
        imageops::overlay(
            &mut canvas,
            &img.to_rgb_image(),
            (x0 + offset) as i64,
            FIGURE_MARGIN as i64,
        );
        draw_histogram(&mut canvas, &channel_histograms(img), x0, hist_y, plot_w);
    }

    canvas
}

fn draw_histogram(canvas: &mut RgbImage, hist: &[[u32; 256]; 3], x0: u32, y0: u32, plot_w: u32) {
    draw_hollow_rect_mut(
        canvas,
        Rect::at(x0 as i32, y0 as i32).of_size(plot_w, HISTOGRAM_HEIGHT),
        FRAME,
    );

    let peak = hist
        .iter()
        .flat_map(|h| h.iter().copied())
        .max()
        .unwrap_or(0)
        .max(1) as f32;
    let x_step = (plot_w - 1) as f32 / 255.0;
    let bottom = (y0 + HISTOGRAM_HEIGHT - 1) as f32;
    let scale = (HISTOGRAM_HEIGHT - 1) as f32 / peak;

    for (channel, color) in hist.iter().zip(CHANNEL_COLORS) {
        let point = |i: usize| {
            (
                x0 as f32 + i as f32 * x_step,
                bottom - channel[i] as f32 * scale,
            )
        };
        for i in 1..256 {
            draw_line_segment_mut(canvas, point(i - 1), point(i), color);
        }
    }
}
