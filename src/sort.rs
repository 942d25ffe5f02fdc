//! Ordering of frames by header field.
//!
//! A series is sorted by comparing one header value, the value of the
//! *sort key*, across records in a chosen direction. Records carry their own
//! [`SortSpec`] (set directly by the view layer), and
//! [`FrameFile::compare_to`](crate::frame::FrameFile::compare_to) consults
//! it. Missing keys are reported, never papered over with a default
//! ordering.

use crate::frame::KEY_NAME;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Apply the direction to a natural (ascending) ordering.
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Ascending => ord,
            Self::Descending => ord.reverse(),
        }
    }
}

/// Which header field orders a series, and which way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }
}

/// The synthetic `name` key exists after every header load, so the default
/// spec can always compare.
impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: KEY_NAME.to_string(),
            direction: SortDirection::Ascending,
        }
    }
}
