// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! On-disk layout of a `.tbl` file.
//!
//! ```text
//! MAGIC | blob 0 | blob 1 | ... | manifest JSON | manifest length (u64 LE) | MAGIC
//! ```
//!
//! Every blob is described by one manifest entry carrying its in-file path,
//! kind, byte range, row count and SHA-256 digest. Groups are not stored;
//! they exist wherever an entry path has more than one segment.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Leading and trailing file marker
pub const MAGIC: &[u8; 8] = b"PMTBL001";

/// File name extension of table files, including the dot
pub const EXTENSION: &str = ".tbl";

/// Bytes after the manifest: length plus trailing magic
pub const TRAILER_LEN: usize = 8 + MAGIC.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Parquet-encoded record batch
    Table,
    /// Nested-JSON settings object
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub kind: EntryKind,
    pub offset: u64,
    pub length: u64,
    #[serde(default)]
    pub rows: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }
}

/// Hex SHA-256 of a blob
#[must_use]
pub fn digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Encode the trailer that follows a manifest of `manifest_len` bytes
#[must_use]
pub fn encode_trailer(manifest_len: u64) -> [u8; TRAILER_LEN] {
    let mut trailer = [0u8; TRAILER_LEN];
    trailer[..8].copy_from_slice(&manifest_len.to_le_bytes());
    trailer[8..].copy_from_slice(MAGIC);
    trailer
}

/// Decode a trailer, returning the manifest length. `None` when the
/// trailing magic is missing.
#[must_use]
pub fn decode_trailer(trailer: &[u8; TRAILER_LEN]) -> Option<u64> {
    if &trailer[8..] != MAGIC {
        return None;
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&trailer[..8]);
    Some(u64::from_le_bytes(len))
}
