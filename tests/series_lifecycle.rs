//! Integration test driving the public series API end to end.
//!
//! Builds a small EDF series on disk, then walks the lifecycle a viewer goes
//! through: scan, lazy header access, parallel preload, sorting, and cache
//! eviction under a deliberately tiny ring.
//!
//! Run with: cargo test --test series_lifecycle

use framescope::config::SETTINGS_FILE;
use framescope::frame::FrameError;
use framescope::series::{FrameSeries, SeriesError};
use framescope::sort::SortDirection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const BLOCK: usize = 512;

/// Minimal `UnsignedShort` EDF writer, enough for the standard decoder.
fn write_edf(dir: &Path, name: &str, width: u32, height: u32, values: &[u16]) -> PathBuf {
    assert_eq!(values.len(), (width * height) as usize);

    let mut header = format!(
        "{{\n\
         HeaderID = EH:000001:000000:000000 ;\n\
         ByteOrder = LowByteFirst ;\n\
         DataType = UnsignedShort ;\n\
         Dim_1 = {width} ;\n\
         Dim_2 = {height} ;\n"
    );
    let unpadded = header.len() + 2;
    let target = unpadded.div_ceil(BLOCK) * BLOCK;
    for _ in 0..target - unpadded {
        header.push(' ');
    }
    header.push_str("}\n");

    let mut bytes = header.into_bytes();
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn write_series(dir: &Path, count: u16) {
    for i in 1..=count {
        let name = format!("scan{i:04}.edf");
        write_edf(dir, &name, 2, 1, &[i * 10, i * 10 + 1]);
    }
}

#[test]
fn lifecycle_from_scan_to_sorted_pixels() {
    let tmp = TempDir::new().unwrap();
    write_series(tmp.path(), 4);

    let mut series = FrameSeries::scan(tmp.path()).unwrap();
    assert_eq!(series.len(), 4);
    assert!(series.frames().iter().all(|f| !f.header_loaded()));

    // A single header access loads just that record.
    let first = series.get(0).unwrap();
    assert_eq!(first.value("Dim_1").unwrap(), "2");
    assert_eq!(first.value("name").unwrap(), "scan0001.edf");
    assert_eq!(first.value("#").unwrap(), "0");
    assert!(first.header_loaded());
    assert!(!series.get(1).unwrap().header_loaded());

    series.preload_images().unwrap();
    assert!(series.frames().iter().all(|f| f.image_loaded()));

    let first = series.get(0).unwrap();
    assert_eq!(first.width().unwrap(), 2);
    assert_eq!(first.height().unwrap(), 1);
    assert_eq!(first.minimum().unwrap(), 10.0);
    assert_eq!(first.maximum().unwrap(), 11.0);
    assert_eq!(first.mean().unwrap(), 10.5);
    assert_eq!(first.stem(), "scan");
    assert_eq!(first.sequence(), "0001");

    let keys = first.keys().unwrap();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(keys.iter().any(|k| k == "name"));
    assert!(keys.iter().any(|k| k == "#"));

    series.sort_by("name", SortDirection::Descending).unwrap();
    let names: Vec<&str> = series.frames().iter().map(|f| f.file_name()).collect();
    assert_eq!(
        names,
        vec!["scan0004.edf", "scan0003.edf", "scan0002.edf", "scan0001.edf"]
    );
    // Sorting reorders the view; registration indexes stay put.
    assert_eq!(series.get(0).unwrap().series_index(), 3);
    assert_eq!(&series.get(0).unwrap().image_as_f32().unwrap()[..], &[40.0, 41.0]);
}

#[test]
fn tiny_ring_evicts_and_redecodes() {
    let tmp = TempDir::new().unwrap();
    write_series(tmp.path(), 3);
    std::fs::write(tmp.path().join(SETTINGS_FILE), "[cache]\nslots = 1\n").unwrap();

    let series = FrameSeries::scan(tmp.path()).unwrap();
    series.preload_images().unwrap();
    assert_eq!(series.cache().capacity(), 1);
    assert_eq!(series.cache().occupied(), 1);

    // Every access of a different frame bounces the previous one out, yet
    // pixels always come back correct and statistics stay fixed.
    for round in 0..2 {
        for (i, frame) in series.frames().iter().enumerate() {
            let expected = (i as u16 + 1) * 10;
            let pixels = frame.image_as_f32().unwrap();
            assert_eq!(
                &pixels[..],
                &[f32::from(expected), f32::from(expected + 1)],
                "frame {i}, round {round}"
            );
            assert_eq!(frame.minimum().unwrap(), f32::from(expected));
        }
    }
}

#[test]
fn concurrent_browsing_shares_one_buffer_per_frame() {
    let tmp = TempDir::new().unwrap();
    write_series(tmp.path(), 3);

    let series = FrameSeries::scan(tmp.path()).unwrap();
    let seen: Mutex<Vec<(usize, Arc<[f32]>)>> = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let series = &series;
            let seen = &seen;
            scope.spawn(move || {
                for (i, frame) in series.frames().iter().enumerate() {
                    let pixels = frame.image_as_f32().unwrap();
                    assert_eq!(frame.value("name").unwrap(), format!("scan{:04}.edf", i + 1));
                    seen.lock().unwrap().push((i, pixels));
                }
            });
        }
    });

    // The default ring holds all three frames, so single-flight loading
    // means every thread got the same allocation per frame.
    let seen = seen.lock().unwrap();
    for i in 0..3 {
        let buffers: Vec<&Arc<[f32]>> =
            seen.iter().filter(|(j, _)| *j == i).map(|(_, b)| b).collect();
        assert_eq!(buffers.len(), 8);
        assert!(buffers.iter().all(|b| Arc::ptr_eq(b, buffers[0])));
    }
}

#[test]
fn missing_sort_key_fails_but_leaves_the_series_usable() {
    let tmp = TempDir::new().unwrap();
    write_series(tmp.path(), 2);

    let mut series = FrameSeries::scan(tmp.path()).unwrap();
    let err = series
        .sort_by("Wavelength", SortDirection::Ascending)
        .unwrap_err();
    assert!(matches!(
        err,
        SeriesError::Frame(FrameError::KeyNotFound { key, .. }) if key == "Wavelength"
    ));

    series.sort_by("name", SortDirection::Ascending).unwrap();
    assert_eq!(series.get(0).unwrap().file_name(), "scan0001.edf");
}
