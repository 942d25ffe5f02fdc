//! Directory scanning and series-wide operations.
//!
//! A [`FrameSeries`] turns one directory of detector output into an ordered
//! collection of [`FrameFile`] records that share a pixel cache and a
//! decoder factory.
//!
//! ## Directory Structure
//!
//! ```text
//! data/                            # Series root
//! ├── framescope.toml              # Settings (optional)
//! ├── scan0001.edf                 # Frame (registered)
//! ├── scan0002.edf                 # Frame (registered)
//! ├── flatfield.tif                # Frame (registered)
//! └── notes.txt                    # Not a frame extension, skipped
//! ```
//!
//! Registration is flat: one directory is one series, subdirectories are not
//! descended into. Files register in name order, and every record keeps its
//! registration index for life; sorting reorders the view, not the identity.
//!
//! ## Preloading
//!
//! [`preload_headers`](FrameSeries::preload_headers) and
//! [`preload_images`](FrameSeries::preload_images) fan decoding out across a
//! worker pool, one decode session per worker. The worker count comes from
//! the `[preload]` settings table.
//!
//! ## Ordering
//!
//! [`sort_by`](FrameSeries::sort_by) orders the series by any header key.
//! Every record must carry the key: a missing key fails the whole operation
//! and leaves the current order unchanged.

use crate::cache::FrameCache;
use crate::config::{self, ConfigError, Settings};
use crate::decode::{DecodeError, DecoderFactory, FrameDecoder, StandardFactory};
use crate::frame::{FrameError, FrameFile};
use crate::sort::{SortDirection, SortSpec};
use log::debug;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("No frame files under {0}")]
    NoFrames(PathBuf),
    #[error("Failed to open a decoder session: {0}")]
    Session(#[source] DecodeError),
    #[error("Thread pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// An ordered directory of frame records behind one cache and one factory.
pub struct FrameSeries {
    root: PathBuf,
    frames: Vec<FrameFile>,
    cache: Arc<FrameCache>,
    factory: Arc<dyn DecoderFactory>,
    workers: usize,
}

impl FrameSeries {
    /// Scan `root` with the standard decoders, settings from the directory's
    /// `framescope.toml` (defaults when absent), and a cache sized by those
    /// settings.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, SeriesError> {
        let root = root.as_ref();
        let settings = config::load_settings(root)?;
        Self::scan_with(
            root,
            &settings,
            Arc::new(FrameCache::new(settings.cache.slots)),
            Arc::new(StandardFactory::new()),
        )
    }

    /// Scan `root` with a caller-supplied cache and decoder factory. The
    /// settings still choose which extensions register and the initial sort
    /// spec; the `[cache]` table is the caller's business here.
    pub fn scan_with(
        root: impl AsRef<Path>,
        settings: &Settings,
        cache: Arc<FrameCache>,
        factory: Arc<dyn DecoderFactory>,
    ) -> Result<Self, SeriesError> {
        let root = root.as_ref().to_path_buf();

        let mut paths = Vec::new();
        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() && settings.scan.accepts(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        if paths.is_empty() {
            return Err(SeriesError::NoFrames(root));
        }

        debug!("registering {} frames under {}", paths.len(), root.display());
        let mut frames = Vec::with_capacity(paths.len());
        for (index, path) in paths.into_iter().enumerate() {
            let frame = FrameFile::new(path, Arc::clone(&cache), Arc::clone(&factory))?;
            frame.set_series_index(index);
            frame.set_sort_spec(settings.sort.clone());
            frames.push(frame);
        }

        Ok(Self {
            root,
            frames,
            cache,
            factory,
            workers: config::effective_workers(&settings.preload),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn frames(&self) -> &[FrameFile] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&FrameFile> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The pixel cache every record of this series stores into.
    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    /// Open a fresh decode session from the series' factory, for callers
    /// that drive the `*_with` record accessors themselves.
    pub fn open_session(&self) -> Result<Box<dyn FrameDecoder>, SeriesError> {
        self.factory.open().map_err(SeriesError::Session)
    }

    /// Decode every header that isn't loaded yet, in parallel.
    pub fn preload_headers(&self) -> Result<(), SeriesError> {
        debug!(
            "preloading {} headers with {} workers",
            self.frames.len(),
            self.workers
        );
        self.preload_with(FrameFile::load_header_with)
    }

    /// Decode every image that the cache can't already serve, in parallel.
    pub fn preload_images(&self) -> Result<(), SeriesError> {
        debug!(
            "preloading {} images with {} workers",
            self.frames.len(),
            self.workers
        );
        self.preload_with(FrameFile::load_image_with)
    }

    fn preload_with<F>(&self, load: F) -> Result<(), SeriesError>
    where
        F: Fn(&FrameFile, &mut dyn FrameDecoder) -> Result<(), FrameError> + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;
        pool.install(|| {
            self.frames.par_iter().try_for_each_init(
                || None,
                |slot: &mut Option<Box<dyn FrameDecoder>>, frame| {
                    // Sessions are single-threaded; open one lazily per
                    // worker and keep reusing it.
                    let decoder = match slot {
                        Some(decoder) => decoder,
                        None => slot.insert(self.factory.open().map_err(SeriesError::Session)?),
                    };
                    load(frame, decoder.as_mut()).map_err(SeriesError::from)
                },
            )
        })
    }

    /// Reorder the series by a header key, loading headers as needed.
    ///
    /// The sort spec is pushed onto every record, so subsequent
    /// [`FrameFile::compare_to`] calls agree with the series order. Equal
    /// values keep registration order regardless of direction.
    pub fn sort_by(&mut self, key: &str, direction: SortDirection) -> Result<(), SeriesError> {
        self.preload_headers()?;

        // Validate before mutating anything: a record without the key
        // aborts the sort with the order intact.
        let mut values = Vec::with_capacity(self.frames.len());
        for frame in &self.frames {
            values.push(frame.value(key)?.to_string());
        }

        let spec = SortSpec::new(key, direction);
        for frame in &self.frames {
            frame.set_sort_spec(spec.clone());
        }

        let mut keyed: Vec<(String, FrameFile)> = values
            .into_iter()
            .zip(std::mem::take(&mut self.frames))
            .collect();
        keyed.sort_by(|(va, a), (vb, b)| {
            direction
                .apply(va.cmp(vb))
                .then_with(|| a.series_index().cmp(&b.series_index()))
        });
        self.frames = keyed.into_iter().map(|(_, frame)| frame).collect();
        Ok(())
    }
}

impl fmt::Debug for FrameSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSeries")
            .field("root", &self.root)
            .field("frames", &self.frames.len())
            .field("workers", &self.workers)
            .finish()
    }
}
