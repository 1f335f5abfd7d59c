//! Image enhancement ahead of OCR

use image::{imageops, GrayImage, ImageReader, Luma};
use std::path::{Path, PathBuf};

use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// 3x3 sharpen kernel (centre 32, ring -2, scaled by 1/16)
const SHARPEN_KERNEL: [f32; 9] = [
    -2.0 / 16.0, -2.0 / 16.0, -2.0 / 16.0,
    -2.0 / 16.0, 32.0 / 16.0, -2.0 / 16.0,
    -2.0 / 16.0, -2.0 / 16.0, -2.0 / 16.0,
];

/// True when the path has a `.pdf` extension (any case)
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Grayscale/contrast/sharpen/brightness pass applied before OCR
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    contrast: f32,
    brightness: f32,
    sharpen: bool,
}

impl ImagePreprocessor {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            contrast: config.contrast,
            brightness: config.brightness,
            sharpen: config.sharpen,
        }
    }

    /// Enhance the image at `path` and write it alongside as `processed_<stem>.png`
    ///
    /// PDFs are returned untouched.
    pub fn preprocess(&self, path: &Path) -> Result<PathBuf> {
        if is_pdf(path) {
            return Ok(path.to_path_buf());
        }

        // content sniffing: chat media is saved as .jpg whatever its format
        let gray = ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?
            .to_luma8();
        let enhanced = self.enhance(gray);

        let output = processed_path(path)?;
        enhanced.save(&output)?;

        tracing::debug!("Preprocessed {} -> {}", path.display(), output.display());
        Ok(output)
    }

    /// Apply the enhancement chain to an already grayscale image
    pub fn enhance(&self, gray: GrayImage) -> GrayImage {
        let mut img = enhance_contrast(gray, self.contrast);
        if self.sharpen {
            img = sharpen(&img);
        }
        enhance_brightness(&mut img, self.brightness);
        img
    }
}

fn processed_path(path: &Path) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::ImageProcessing(format!("Invalid file name: {}", path.display())))?;

    let name = format!("processed_{}.png", stem);
    Ok(match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    })
}

/// Convolve with the sharpen kernel; the one-pixel border keeps its input values
fn sharpen(img: &GrayImage) -> GrayImage {
    let mut out: GrayImage = imageops::filter3x3(img, &SHARPEN_KERNEL);
    let (width, height) = img.dimensions();
    for (x, y, pixel) in img.enumerate_pixels() {
        if x == 0 || y == 0 || x + 1 >= width || y + 1 >= height {
            out.put_pixel(x, y, *pixel);
        }
    }
    out
}

/// Rounded mean grey level
fn mean_level(img: &GrayImage) -> f32 {
    let count = img.width() as usize * img.height() as usize;
    if count == 0 {
        return 0.0;
    }
    let total: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    (total as f32 / count as f32).round()
}

/// Blend each pixel away from the mean grey level: `mean + f * (p - mean)`
fn enhance_contrast(mut img: GrayImage, factor: f32) -> GrayImage {
    let mean = mean_level(&img);
    for pixel in img.pixels_mut() {
        let value = mean + factor * (pixel.0[0] as f32 - mean);
        *pixel = Luma([clamp_u8(value)]);
    }
    img
}

/// Scale every pixel by `factor`
fn enhance_brightness(img: &mut GrayImage, factor: f32) {
    for pixel in img.pixels_mut() {
        *pixel = Luma([clamp_u8(pixel.0[0] as f32 * factor)]);
    }
}

fn clamp_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
