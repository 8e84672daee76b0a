// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::*;

/// Wildcard character accepted inside a segment
pub const WILDCARD: char = '*';

/// One `/`-separated segment of an in-file pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentPattern {
    /// A segment with one or more `*`, split around the wildcards.
    /// `run*_*` is stored as `["run", "_", ""]`.
    Wildcard { parts: Vec<String> },
    /// A plain name that must match exactly
    Literal(String),
}

impl SegmentPattern {
    /// Parse a single segment. Empty segments are rejected.
    pub fn parse(segment: &str) -> Result<Self> {
        if segment.is_empty() {
            return Err(Error::invalid_location(segment, "empty segment"));
        }
        if segment.contains(WILDCARD) {
            Ok(SegmentPattern::Wildcard {
                parts: segment.split(WILDCARD).map(str::to_string).collect(),
            })
        } else {
            Ok(SegmentPattern::Literal(segment.to_string()))
        }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, SegmentPattern::Wildcard { .. })
    }

    /// Check whether a child name matches this segment
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, name: S) -> bool {
        let name = name.as_ref();
        match self {
            SegmentPattern::Literal(literal) => name == literal,
            SegmentPattern::Wildcard { parts } => match_parts(parts, name),
        }
    }
}

// The first part anchors the start, the last anchors the end, and the
// middle parts are found left to right in between.
fn match_parts(parts: &[String], name: &str) -> bool {
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return name.is_empty(),
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return name == first,
    };

    if name.len() < first.len() + last.len()
        || !name.starts_with(first.as_str())
        || !name.ends_with(last.as_str())
    {
        return false;
    }

    let mut remaining = &name[first.len()..name.len() - last.len()];
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    true
}

/// Parse a `/`-separated in-file pattern into segments
pub fn parse_segments(pattern: &str) -> Result<Vec<SegmentPattern>> {
    pattern.split('/').map(SegmentPattern::parse).collect()
}
