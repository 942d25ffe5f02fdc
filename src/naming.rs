//! Centralized filename parsing for detector frame series.
//!
//! Detector writers number the frames of a scan in one of two conventions,
//! and every consumer (series registration, default ordering, UI labels)
//! needs the same stem/sequence split:
//!
//! - **Numbered extension** (bruker style): `lysozyme.0023`, where the part
//!   after the first dot is the frame number itself. A trailing compression
//!   suffix is allowed: `lysozyme.0023.gz`.
//! - **Numbered stem** (suffix style): `lysozyme0023.edf`, where the frame
//!   number is a digit run at the end of the base name, before the extension.
//!
//! The sequence is kept as the raw digit string so leading zeros survive
//! (frame `0023` and frame `23` come from different writers and must not be
//! conflated when rebuilding sibling filenames).

/// Result of splitting a frame filename like `lysozyme0023.edf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameName {
    /// Base name shared by every frame of the scan (e.g. `lysozyme`).
    pub stem: String,
    /// Raw digit run identifying this frame (e.g. `0023`), zeros preserved.
    /// For filenames with no number, this degenerates to the stem.
    pub sequence: String,
}

/// Split a frame filename into scan stem and frame sequence.
///
/// Handles these patterns:
/// - `"lysozyme.0023"` → stem="lysozyme", sequence="0023" (bruker)
/// - `"lysozyme.0023.gz"` → stem="lysozyme", sequence="0023" (compressed bruker)
/// - `"lysozyme0023.edf"` → stem="lysozyme", sequence="0023"
/// - `"frame12"` → stem="frame", sequence="12" (no extension)
/// - `"darkfield.edf"` → stem="darkfield", sequence="darkfield" (unnumbered)
pub fn parse_frame_name(file_name: &str) -> FrameName {
    let mut parts = file_name.split('.');
    let base = parts.next().unwrap_or(file_name);

    // Bruker convention: the second dot-part is the frame number itself.
    if let Some(second) = parts.next()
        && second.parse::<i32>().is_ok()
    {
        return FrameName {
            stem: base.to_string(),
            sequence: second.to_string(),
        };
    }

    // Suffix convention: trailing digit run of the base name.
    let digits_at = base
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .unwrap_or(base.len());
    if digits_at < base.len() {
        return FrameName {
            stem: base[..digits_at].to_string(),
            sequence: base[digits_at..].to_string(),
        };
    }

    // No number anywhere: both views collapse to the base name.
    FrameName {
        stem: base.to_string(),
        sequence: base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bruker_numbered_extension() {
        let n = parse_frame_name("lysozyme.0023");
        assert_eq!(n.stem, "lysozyme");
        assert_eq!(n.sequence, "0023");
    }

    #[test]
    fn bruker_with_compression_suffix() {
        let n = parse_frame_name("lysozyme.0023.gz");
        assert_eq!(n.stem, "lysozyme");
        assert_eq!(n.sequence, "0023");
    }

    #[test]
    fn suffix_numbered_stem() {
        let n = parse_frame_name("lysozyme0023.edf");
        assert_eq!(n.stem, "lysozyme");
        assert_eq!(n.sequence, "0023");
    }

    #[test]
    fn suffix_number_without_extension() {
        let n = parse_frame_name("frame12");
        assert_eq!(n.stem, "frame");
        assert_eq!(n.sequence, "12");
    }

    #[test]
    fn leading_zeros_preserved() {
        let n = parse_frame_name("scan_a00007.tif");
        assert_eq!(n.stem, "scan_a");
        assert_eq!(n.sequence, "00007");
    }

    #[test]
    fn unnumbered_name_collapses_to_base() {
        let n = parse_frame_name("darkfield.edf");
        assert_eq!(n.stem, "darkfield");
        assert_eq!(n.sequence, "darkfield");
    }

    #[test]
    fn unnumbered_without_extension() {
        let n = parse_frame_name("calibration");
        assert_eq!(n.stem, "calibration");
        assert_eq!(n.sequence, "calibration");
    }

    #[test]
    fn non_numeric_second_part_falls_through_to_suffix_scan() {
        // `.edf` is not a number, so the digit run of the base decides.
        let n = parse_frame_name("run42.edf.gz");
        assert_eq!(n.stem, "run");
        assert_eq!(n.sequence, "42");
    }

    #[test]
    fn digits_only_base_name() {
        let n = parse_frame_name("0412.edf");
        assert_eq!(n.stem, "");
        assert_eq!(n.sequence, "0412");
    }

    #[test]
    fn interior_digits_are_not_a_sequence() {
        let n = parse_frame_name("scan12pos.edf");
        assert_eq!(n.stem, "scan12pos");
        assert_eq!(n.sequence, "scan12pos");
    }

    #[test]
    fn bruker_takes_precedence_over_suffix_digits() {
        // Base ends in digits *and* the second part is numeric: the bruker
        // reading wins, the base is the stem untouched.
        let n = parse_frame_name("pos7.0023");
        assert_eq!(n.stem, "pos7");
        assert_eq!(n.sequence, "0023");
    }
}
