//! Raster adapter over the `image` crate.
//!
//! Detector vendors that don't write EDF mostly write TIFF (Pilatus, ADSC
//! exports), and reduced data ends up as PNG or JPEG. This adapter decodes
//! those through the pure-Rust `image` crate and presents them behind the
//! same session trait as the native EDF parser.
//!
//! Grayscale sources keep their raw channel values (`Luma16` stays
//! `0..=65535`), so detector counts survive the trip to `f32`. Colour
//! sources collapse to 16-bit luma first.
//!
//! Header keys mirror the EDF names (`Dim_1`, `Dim_2`) so a sort key chosen
//! for one format keeps working across a mixed series.

use super::{DecodeError, DecodedFrame, FrameDecoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// Raster decode session.
#[derive(Debug, Default)]
pub struct RasterDecoder;

impl RasterDecoder {
    pub fn new() -> Self {
        Self
    }
}

fn image_error(path: &Path, error: image::ImageError) -> DecodeError {
    match error {
        image::ImageError::IoError(io) => DecodeError::Io(io),
        other => DecodeError::Malformed(format!("{}: {other}", path.display())),
    }
}

impl FrameDecoder for RasterDecoder {
    fn read_header(&mut self, path: &Path) -> Result<Vec<(String, String)>, DecodeError> {
        // Container header only; pixel data stays on disk.
        let (width, height) = image::image_dimensions(path).map_err(|e| image_error(path, e))?;
        let format = ImageFormat::from_path(path)
            .map(|f| format!("{f:?}"))
            .unwrap_or_else(|_| "unknown".to_string());

        Ok(vec![
            ("Dim_1".to_string(), width.to_string()),
            ("Dim_2".to_string(), height.to_string()),
            ("Format".to_string(), format),
        ])
    }

    fn read_image(&mut self, path: &Path) -> Result<DecodedFrame, DecodeError> {
        let img = ImageReader::open(path)
            .map_err(DecodeError::Io)?
            .decode()
            .map_err(|e| image_error(path, e))?;
        let width = img.width();
        let height = img.height();

        let pixels: Vec<f32> = match img {
            DynamicImage::ImageLuma8(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
            DynamicImage::ImageLuma16(buf) => buf.into_raw().into_iter().map(f32::from).collect(),
            DynamicImage::ImageLumaA8(buf) => {
                buf.pixels().map(|p| f32::from(p.0[0])).collect()
            }
            DynamicImage::ImageLumaA16(buf) => {
                buf.pixels().map(|p| f32::from(p.0[0])).collect()
            }
            other => other
                .into_luma16()
                .into_raw()
                .into_iter()
                .map(f32::from)
                .collect(),
        };

        Ok(DecodedFrame {
            pixels,
            width,
            height,
        })
    }
}
