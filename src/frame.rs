//! Per-file frame records.
//!
//! A [`FrameFile`] is the unit a viewer works with: one file of a series,
//! registered cheaply up front and decoded only when something actually asks
//! for header fields or pixels.
//!
//! # Lifecycle
//!
//! ```text
//! new     header and pixels untouched; only the path is validated
//!   │ value()/keys()/load_header()
//!   ▼
//! header  ordered key/value pairs + synthetic `name` and `#` entries
//!   │ width()/minimum()/image_as_f32()/load_image()
//!   ▼
//! image   dimensions + min/max/mean fixed for the record's lifetime;
//!         pixels live in the shared ring cache and may be evicted
//! ```
//!
//! Loaded state is monotone: once the header or the image facts are
//! published they never change, even when an evicted frame is decoded again
//! (the fresh pixels go back to the cache, the statistics stay as computed
//! from the first decode).
//!
//! # Concurrency
//!
//! Records are shared across threads. Each record owns a guard mutex that
//! makes loads single-flight: callers that find the loaded flag set skip the
//! guard entirely, and concurrent callers of an unloaded record collapse to
//! one decode. The guard is scoped to a single load call, so comparing two
//! records (which may lazily load both) never holds two guards at once.
//!
//! Decode sessions are single-threaded; workers that bring their own session
//! use the `*_with` variants, everything else opens a short-lived session
//! through the record's injected [`DecoderFactory`].

use crate::cache::FrameCache;
use crate::decode::{DecodeError, DecodedFrame, DecoderFactory, FrameDecoder};
use crate::naming::{FrameName, parse_frame_name};
use crate::sort::{SortDirection, SortSpec};
use crate::stats::FrameStats;
use log::{debug, warn};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use thiserror::Error;

/// Synthetic header key holding the short file name.
pub const KEY_NAME: &str = "name";
/// Synthetic header key holding the series index the record was registered
/// under.
pub const KEY_INDEX: &str = "#";

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("Header key '{key}' not present in {file}")]
    KeyNotFound { key: String, file: String },
}

struct HeaderData {
    values: HashMap<String, String>,
    /// Keys in first-seen decoder order; synthetic keys are map-only.
    arrival: Vec<String>,
}

struct ImageInfo {
    width: u32,
    height: u32,
    stats: FrameStats,
}

/// Sentinel for "no cache slot remembered yet".
const NO_SLOT: usize = usize::MAX;

/// One file of a frame series: lazy header, lazy pixels, sticky statistics.
pub struct FrameFile {
    path: PathBuf,
    file_name: String,
    cache: Arc<FrameCache>,
    factory: Arc<dyn DecoderFactory>,
    guard: Mutex<()>,
    header: OnceLock<HeaderData>,
    image: OnceLock<ImageInfo>,
    name: OnceLock<FrameName>,
    slot: AtomicUsize,
    series_index: AtomicUsize,
    load_millis: AtomicU64,
    sort: Mutex<SortSpec>,
}

impl FrameFile {
    /// Register `path` as a frame record. Fails with [`FrameError::NotFound`]
    /// when the path does not exist; nothing is decoded yet.
    pub fn new(
        path: impl Into<PathBuf>,
        cache: Arc<FrameCache>,
        factory: Arc<dyn DecoderFactory>,
    ) -> Result<Self, FrameError> {
        let path = path.into();
        if !path.exists() {
            return Err(FrameError::NotFound(path));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self {
            path,
            file_name,
            cache,
            factory,
            guard: Mutex::new(()),
            header: OnceLock::new(),
            image: OnceLock::new(),
            name: OnceLock::new(),
            slot: AtomicUsize::new(NO_SLOT),
            series_index: AtomicUsize::new(0),
            load_millis: AtomicU64::new(0),
            sort: Mutex::new(SortSpec::default()),
        })
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path segment, also the value of the synthetic `name` key.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Scan stem of the file name (see [`crate::naming`]).
    pub fn stem(&self) -> &str {
        &self.frame_name().stem
    }

    /// Frame sequence of the file name, digits preserved verbatim.
    pub fn sequence(&self) -> &str {
        &self.frame_name().sequence
    }

    fn frame_name(&self) -> &FrameName {
        self.name.get_or_init(|| parse_frame_name(&self.file_name))
    }

    /// Index of this record within its series, assigned at registration.
    /// Feeds the synthetic `#` key (captured at header-load time) and breaks
    /// comparison ties.
    pub fn series_index(&self) -> usize {
        self.series_index.load(Relaxed)
    }

    pub fn set_series_index(&self, index: usize) {
        self.series_index.store(index, Relaxed);
    }

    // =========================================================================
    // Load state
    // =========================================================================

    pub fn header_loaded(&self) -> bool {
        self.header.get().is_some()
    }

    pub fn image_loaded(&self) -> bool {
        self.image.get().is_some()
    }

    /// Wall time of the most recent image decode, zero when the last access
    /// was served from the cache. Informational only.
    pub fn last_load_millis(&self) -> u64 {
        self.load_millis.load(Relaxed)
    }

    // =========================================================================
    // Header
    // =========================================================================

    /// Load the header if it isn't loaded yet, through a session from the
    /// record's factory.
    pub fn load_header(&self) -> Result<(), FrameError> {
        self.header_data().map(|_| ())
    }

    /// [`load_header`](Self::load_header) driving a caller-supplied session.
    pub fn load_header_with(&self, decoder: &mut dyn FrameDecoder) -> Result<(), FrameError> {
        self.header_data_with(decoder).map(|_| ())
    }

    /// Value of a header field (loading the header on demand). Synthetic
    /// keys resolve like any other.
    pub fn value(&self, key: &str) -> Result<&str, FrameError> {
        let header = self.header_data()?;
        header
            .values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| FrameError::KeyNotFound {
                key: key.to_string(),
                file: self.file_name.clone(),
            })
    }

    /// All header keys, sorted ascending.
    pub fn keys(&self) -> Result<Vec<String>, FrameError> {
        let header = self.header_data()?;
        let mut keys: Vec<String> = header.values.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Keys in the order the decoder delivered them, first occurrence wins.
    /// Synthetic keys are excluded.
    pub fn keys_in_arrival_order(&self) -> Result<Vec<String>, FrameError> {
        Ok(self.header_data()?.arrival.clone())
    }

    fn header_data(&self) -> Result<&HeaderData, FrameError> {
        if let Some(header) = self.header.get() {
            return Ok(header);
        }
        let mut session = self.open_session()?;
        self.header_data_with(session.as_mut())
    }

    fn header_data_with(
        &self,
        decoder: &mut dyn FrameDecoder,
    ) -> Result<&HeaderData, FrameError> {
        if let Some(header) = self.header.get() {
            return Ok(header);
        }
        if !self.path.exists() {
            return Err(FrameError::NotFound(self.path.clone()));
        }

        let _permit = self.guard.lock();
        if let Some(header) = self.header.get() {
            // Lost the race: another caller decoded while we waited.
            return Ok(header);
        }

        debug!("reading header of {}", self.path.display());
        let pairs = decoder
            .read_header(&self.path)
            .map_err(|e| self.decode_error(e))?;

        let mut values = HashMap::with_capacity(pairs.len() + 2);
        let mut arrival = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            if !values.contains_key(&key) {
                arrival.push(key.clone());
            }
            values.insert(key, value);
        }
        values.insert(KEY_NAME.to_string(), self.file_name.clone());
        values.insert(KEY_INDEX.to_string(), self.series_index().to_string());

        Ok(self.header.get_or_init(|| HeaderData { values, arrival }))
    }

    // =========================================================================
    // Image
    // =========================================================================

    /// Make sure pixels, dimensions, and statistics are available, decoding
    /// through a session from the record's factory if the cache can't serve
    /// us.
    pub fn load_image(&self) -> Result<(), FrameError> {
        self.image_as_f32().map(|_| ())
    }

    /// [`load_image`](Self::load_image) driving a caller-supplied session.
    pub fn load_image_with(&self, decoder: &mut dyn FrameDecoder) -> Result<(), FrameError> {
        self.load_pixels_with(decoder).map(|_| ())
    }

    /// The frame's pixels as shared `f32`s: the cached buffer itself, not a
    /// copy.
    pub fn image_as_f32(&self) -> Result<Arc<[f32]>, FrameError> {
        if let Some(pixels) = self.cached_pixels() {
            self.load_millis.store(0, Relaxed);
            return Ok(pixels);
        }
        let mut session = self.open_session()?;
        Ok(self.load_pixels_with(session.as_mut())?.0)
    }

    /// [`image_as_f32`](Self::image_as_f32) driving a caller-supplied
    /// session.
    pub fn image_as_f32_with(
        &self,
        decoder: &mut dyn FrameDecoder,
    ) -> Result<Arc<[f32]>, FrameError> {
        Ok(self.load_pixels_with(decoder)?.0)
    }

    /// Lenient variant of [`image_as_f32_with`](Self::image_as_f32_with): a
    /// decode failure is logged and swallowed, and whatever the remembered
    /// cache slot still holds is returned, possibly nothing.
    pub fn image_as_f32_lenient(&self, decoder: &mut dyn FrameDecoder) -> Option<Arc<[f32]>> {
        if let Err(e) = self.load_pixels_with(decoder) {
            warn!("ignoring failed image load: {e}");
        }
        self.cached_pixels()
    }

    /// Fresh integer view of the pixels, truncated toward zero. Never
    /// cached; every call allocates anew.
    pub fn image_as_i32(&self) -> Result<Vec<i32>, FrameError> {
        let pixels = self.image_as_f32()?;
        Ok(pixels.iter().map(|&v| v as i32).collect())
    }

    /// [`image_as_i32`](Self::image_as_i32) driving a caller-supplied
    /// session.
    pub fn image_as_i32_with(
        &self,
        decoder: &mut dyn FrameDecoder,
    ) -> Result<Vec<i32>, FrameError> {
        let pixels = self.image_as_f32_with(decoder)?;
        Ok(pixels.iter().map(|&v| v as i32).collect())
    }

    pub fn width(&self) -> Result<u32, FrameError> {
        Ok(self.image_info()?.width)
    }

    pub fn height(&self) -> Result<u32, FrameError> {
        Ok(self.image_info()?.height)
    }

    pub fn minimum(&self) -> Result<f32, FrameError> {
        Ok(self.image_info()?.stats.min)
    }

    pub fn maximum(&self) -> Result<f32, FrameError> {
        Ok(self.image_info()?.stats.max)
    }

    pub fn mean(&self) -> Result<f32, FrameError> {
        Ok(self.image_info()?.stats.mean)
    }

    /// Min/max/mean as one value, computed from the first decode of this
    /// record and never revised.
    pub fn stats(&self) -> Result<FrameStats, FrameError> {
        Ok(self.image_info()?.stats)
    }

    fn image_info(&self) -> Result<&ImageInfo, FrameError> {
        if let Some(info) = self.image.get() {
            return Ok(info);
        }
        let mut session = self.open_session()?;
        Ok(self.load_pixels_with(session.as_mut())?.1)
    }

    fn load_pixels_with(
        &self,
        decoder: &mut dyn FrameDecoder,
    ) -> Result<(Arc<[f32]>, &ImageInfo), FrameError> {
        if let Some(pixels) = self.cached_pixels()
            && let Some(info) = self.image.get()
        {
            self.load_millis.store(0, Relaxed);
            return Ok((pixels, info));
        }

        let _permit = self.guard.lock();
        if let Some(pixels) = self.cached_pixels()
            && let Some(info) = self.image.get()
        {
            self.load_millis.store(0, Relaxed);
            return Ok((pixels, info));
        }

        debug!("reading image {}", self.path.display());
        let started = Instant::now();
        let DecodedFrame {
            pixels,
            width,
            height,
        } = decoder
            .read_image(&self.path)
            .map_err(|e| self.decode_error(e))?;

        let pixels: Arc<[f32]> = Arc::from(pixels);
        let slot = self.cache.store(&self.path, Arc::clone(&pixels));
        self.slot.store(slot, Relaxed);

        // First decode fixes dimensions and statistics for good; a reload
        // after eviction refreshes only the pixels.
        let info = self.image.get_or_init(|| ImageInfo {
            width,
            height,
            stats: FrameStats::compute(&pixels),
        });
        self.load_millis
            .store(started.elapsed().as_millis() as u64, Relaxed);
        Ok((pixels, info))
    }

    fn cached_pixels(&self) -> Option<Arc<[f32]>> {
        match self.slot.load(Relaxed) {
            NO_SLOT => None,
            slot => self.cache.lookup(slot, &self.path),
        }
    }

    fn open_session(&self) -> Result<Box<dyn FrameDecoder>, FrameError> {
        self.factory.open().map_err(|e| self.decode_error(e))
    }

    fn decode_error(&self, source: DecodeError) -> FrameError {
        FrameError::Decode {
            path: self.path.clone(),
            source,
        }
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    pub fn sort_spec(&self) -> SortSpec {
        self.sort.lock().clone()
    }

    pub fn set_sort_spec(&self, spec: SortSpec) {
        *self.sort.lock() = spec;
    }

    pub fn set_sort_key(&self, key: impl Into<String>) {
        self.sort.lock().key = key.into();
    }

    pub fn set_sort_direction(&self, direction: SortDirection) {
        self.sort.lock().direction = direction;
    }

    /// Compare against `other` using this record's sort spec, loading both
    /// headers as needed. A key absent from either header is an error, never
    /// a silent fallback ordering. Equal values fall back to series-index
    /// order so sorting stays stable.
    pub fn compare_to(&self, other: &FrameFile) -> Result<Ordering, FrameError> {
        let spec = self.sort_spec();
        let ord = spec
            .direction
            .apply(self.value(&spec.key)?.cmp(other.value(&spec.key)?));
        Ok(match ord {
            Ordering::Equal => self.series_index().cmp(&other.series_index()),
            decided => decided,
        })
    }

    /// Switch this record's sort key, then compare as
    /// [`compare_to`](FrameFile::compare_to). The direction is whatever the
    /// record currently holds.
    pub fn compare_by(&self, key: &str, other: &FrameFile) -> Result<Ordering, FrameError> {
        self.set_sort_key(key);
        self.compare_to(other)
    }
}

impl fmt::Debug for FrameFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameFile")
            .field("path", &self.path)
            .field("header_loaded", &self.header_loaded())
            .field("image_loaded", &self.image_loaded())
            .field("series_index", &self.series_index())
            .finish()
    }
}
