//! Shared test fixtures for the framescope test suite.
//!
//! Builders for EDF byte blobs and on-disk frame files, so decoder, record,
//! and series tests don't each hand-roll header padding.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = write_edf_u16(tmp.path(), "scan0001.edf", 2, 2, &[0, 1, 2, 3]);
//! ```

use std::path::{Path, PathBuf};

/// EDF headers are padded to whole blocks of this size.
const BLOCK: usize = 512;

// =========================================================================
// EDF byte builders
// =========================================================================

/// Build a complete EDF byte blob: a `{`-delimited header with the given
/// key/value lines, padded to a 512-byte multiple, followed by `data`.
pub fn edf_bytes(pairs: &[(&str, &str)], data: &[u8]) -> Vec<u8> {
    let mut header = String::from("{\n");
    for (key, value) in pairs {
        header.push_str(&format!("{key} = {value} ;\n"));
    }
    // Space padding before the closing brace, the way beamline writers
    // fill their blocks.
    let unpadded = header.len() + 2;
    let target = unpadded.div_ceil(BLOCK) * BLOCK;
    for _ in 0..target - unpadded {
        header.push(' ');
    }
    header.push_str("}\n");

    let mut bytes = header.into_bytes();
    bytes.extend_from_slice(data);
    bytes
}

/// Write a minimal `UnsignedShort` EDF file and return its path.
///
/// Header keys land in writer order: `HeaderID`, `ByteOrder`, `DataType`,
/// `Dim_1`, `Dim_2`. Panics if the pixel count doesn't match the dimensions,
/// which would make the fixture silently undecodable.
pub fn write_edf_u16(dir: &Path, name: &str, width: u32, height: u32, values: &[u16]) -> PathBuf {
    assert_eq!(
        values.len(),
        (width * height) as usize,
        "fixture pixel count must match {width}x{height}"
    );
    let dim_1 = width.to_string();
    let dim_2 = height.to_string();
    let pairs = [
        ("HeaderID", "EH:000001:000000:000000"),
        ("ByteOrder", "LowByteFirst"),
        ("DataType", "UnsignedShort"),
        ("Dim_1", dim_1.as_str()),
        ("Dim_2", dim_2.as_str()),
    ];

    let mut data = Vec::with_capacity(values.len() * 2);
    for v in values {
        data.extend_from_slice(&v.to_le_bytes());
    }

    let path = dir.join(name);
    std::fs::write(&path, edf_bytes(&pairs, &data)).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_is_block_padded() {
        let bytes = edf_bytes(&[("Dim_1", "4")], &[1, 2, 3]);
        // Header fills exactly one block; data follows it.
        assert_eq!(bytes.len(), BLOCK + 3);
        assert_eq!(&bytes[BLOCK..], &[1, 2, 3]);
        assert_eq!(bytes[BLOCK - 2], b'}');
    }

    #[test]
    fn oversized_header_spills_into_the_next_block() {
        let value = "x".repeat(600);
        let bytes = edf_bytes(&[("Comment", &value)], &[]);
        assert_eq!(bytes.len(), 2 * BLOCK);
    }
}
