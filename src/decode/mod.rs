//! Frame decoding, the pluggable boundary between records and file formats.
//!
//! | Piece | Role |
//! |---|---|
//! | [`FrameDecoder`] | one decode session: header pairs + pixel buffers |
//! | [`DecoderFactory`] | opens a fresh session per worker thread |
//! | [`EdfDecoder`](edf::EdfDecoder) | native ESRF Data Format parser |
//! | [`RasterDecoder`](raster::RasterDecoder) | `image`-crate path for detector TIFF/PNG/JPEG |
//! | [`StandardDecoder`] | production session routing by file extension |
//!
//! # Sessions and threads
//!
//! A [`FrameDecoder`] is a *session*: it may keep per-call scratch state and
//! is never shared between threads. Anything that fans work out across
//! threads holds a [`DecoderFactory`] and opens one session per worker. The
//! record layer follows the same rule: its implicit-load accessors open a
//! short-lived session through the record's injected factory.

pub mod edf;
pub mod raster;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use edf::EdfDecoder;
pub use raster::RasterDecoder;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed frame data: {0}")]
    Malformed(String),
    #[error("Unsupported frame format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// One decoded frame: row-major pixels, `pixels.len() == width * height`.
///
/// Everything is widened to `f32` at the decode boundary. Detector counts are
/// integral, but a single pixel type keeps the cache, statistics, and display
/// scaling format-agnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub pixels: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

/// One decode session. Single-threaded by contract: `Send` so a session can
/// move into a worker, never `Sync`.
pub trait FrameDecoder: Send {
    /// Read the header of `path` as ordered `(key, value)` pairs, file order
    /// preserved. Values arrive as text; adapters do any coercion.
    fn read_header(&mut self, path: &Path) -> Result<Vec<(String, String)>, DecodeError>;

    /// Decode the pixel data of `path`.
    fn read_image(&mut self, path: &Path) -> Result<DecodedFrame, DecodeError>;
}

/// Opens decode sessions. Shared freely across threads; the sessions it
/// produces are not.
pub trait DecoderFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameDecoder>, DecodeError>;
}

/// Extensions the standard decoder accepts, EDF first.
const STANDARD_EXTENSIONS: &[&str] = &["edf", "tif", "tiff", "png", "jpg", "jpeg"];

/// File extensions with a compiled-in decode path.
pub fn supported_extensions() -> &'static [&'static str] {
    STANDARD_EXTENSIONS
}

/// Production session: EDF goes through the native parser, every other
/// supported extension through the raster path.
#[derive(Default)]
pub struct StandardDecoder {
    edf: EdfDecoder,
    raster: RasterDecoder,
}

impl StandardDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn route(&mut self, path: &Path) -> Result<&mut dyn FrameDecoder, DecodeError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "edf" => Ok(&mut self.edf),
            e if STANDARD_EXTENSIONS.contains(&e) => Ok(&mut self.raster),
            _ => Err(DecodeError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl FrameDecoder for StandardDecoder {
    fn read_header(&mut self, path: &Path) -> Result<Vec<(String, String)>, DecodeError> {
        self.route(path)?.read_header(path)
    }

    fn read_image(&mut self, path: &Path) -> Result<DecodedFrame, DecodeError> {
        self.route(path)?.read_image(path)
    }
}

/// Factory for [`StandardDecoder`] sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardFactory;

impl StandardFactory {
    pub fn new() -> Self {
        Self
    }
}

impl DecoderFactory for StandardFactory {
    fn open(&self) -> Result<Box<dyn FrameDecoder>, DecodeError> {
        Ok(Box::new(StandardDecoder::new()))
    }
}
