//! # Framescope
//!
//! Lazy-loading file records and a shared decode cache for browsing
//! scientific diffraction image series. A directory of detector output
//! becomes a series of records: registering a frame costs a path check,
//! and headers, pixels, and statistics materialize only when something
//! asks for them.
//!
//! # Architecture: Records Over a Shared Ring
//!
//! ```text
//! FrameSeries ──owns──► [FrameFile, FrameFile, ...] ──store/lookup──► FrameCache
//!      │                      │                                      (ring of
//!      │                      │ load_header / load_image              pixel
//!      ▼                      ▼                                       buffers)
//! DecoderFactory ──open()──► FrameDecoder session (one per thread)
//! ```
//!
//! Records stay cheap until touched, then load exactly once: concurrent
//! accessors of the same record collapse to a single decode, and the
//! resulting pixel buffer lands in a cache shared by the whole series.
//! When the ring wraps and evicts a frame, a later access decodes it again;
//! its dimensions and statistics, fixed by the first load, do not change.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`series`] | Scans a directory into an ordered series, preloads in parallel, sorts by header key |
//! | [`frame`] | The per-file record: lazy header and image state, accessors, comparisons |
//! | [`cache`] | Fixed-capacity ring of pixel buffers shared across records |
//! | [`decode`] | Decoder port: session/factory traits, EDF and raster implementations |
//! | [`sort`] | Sort key and direction types |
//! | [`stats`] | Min/max/mean over a pixel buffer |
//! | [`naming`] | Stem/sequence parsing of frame file names |
//! | [`config`] | `framescope.toml` loading and validation |
//!
//! # Design Decisions
//!
//! ## Ring Cache, Not LRU
//!
//! Detector frames are large and uniform; a viewer flipping through a scan
//! touches them in streaks, not with the skewed reuse an LRU earns its
//! bookkeeping on. The cache is a fixed ring: each decoded buffer claims the
//! next slot, wrapping around. Memory use is exactly `slots` buffers, and
//! since buffers are handed out as [`Arc`](std::sync::Arc) slices, eviction
//! never invalidates pixels a caller is still holding.
//!
//! ## One Decode Session Per Thread
//!
//! Format parsers keep per-call scratch state, so a decode session is
//! `&mut self` and never shared. Concurrency happens one level up: a
//! [`decode::DecoderFactory`] is `Send + Sync` and opens a fresh session for
//! every worker. Records make loads single-flight with a per-record guard,
//! so parallel preloading never decodes the same file twice.
//!
//! ## Statistics Are Sticky
//!
//! Min, max, and mean are computed from the first decode of a record and
//! kept for its lifetime, even when the frame is evicted and decoded again.
//! Display scaling stays stable while browsing, and the common case of an
//! unchanged file on disk makes recomputation pure waste.
//!
//! ## EDF Parsed Natively, Rasters via `image`
//!
//! ESRF Data Format is an ASCII header plus raw binary, simple enough to
//! parse directly ([`decode::edf`]). Detector TIFF/PNG/JPEG go through the
//! `image` crate ([`decode::raster`]), keeping raw integer counts rather
//! than display-converting them. Both sit behind the same [`decode`] port,
//! so a facility format can be added without touching record logic.
//!
//! ## Settings Live with the Data
//!
//! An optional `framescope.toml` next to the frames configures cache size,
//! accepted extensions, initial ordering, and preload parallelism. A missing
//! file means stock defaults; a present file only needs the keys it
//! overrides, and unknown keys are rejected to catch typos early.

pub mod cache;
pub mod config;
pub mod decode;
pub mod frame;
pub mod naming;
pub mod series;
pub mod sort;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_helpers;
