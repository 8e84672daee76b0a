// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::{Path, PathBuf};

use arrow_array::RecordBatch;
use diagnostics::*;
use settings::{NestedNode, SettingsSink};
use tempfile::NamedTempFile;

use crate::blob;
use crate::error::*;
use crate::format::{self, EntryKind, MAGIC, Manifest, ManifestEntry};
use crate::glob::WILDCARD;

/// Writer for a new `.tbl` file.
///
/// Everything goes to a temporary file next to the destination. The
/// destination only appears when [`TableFileWriter::finish`] succeeds;
/// dropping the writer earlier removes the temporary file.
pub struct TableFileWriter {
    dest: PathBuf,
    temp: NamedTempFile,
    offset: u64,
    manifest: Manifest,
}

impl TableFileWriter {
    pub fn create<P: AsRef<Path>>(dest: P) -> Result<Self> {
        let dest = dest.as_ref().to_path_buf();
        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(MAGIC)?;

        debug!(
            "Writing table file {dest} via {temp}",
            dest: dest.display().to_string(),
            temp: temp.path().display().to_string()
        );
        Ok(Self {
            dest,
            temp,
            offset: MAGIC.len() as u64,
            manifest: Manifest::default(),
        })
    }

    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Reject empty segments, wildcards, duplicates, and paths that would
    /// turn an existing entry into a group (or the reverse).
    fn check_location(&self, location: &str) -> Result<()> {
        if location.split('/').any(str::is_empty) {
            return Err(Error::invalid_location(location, "empty segment"));
        }
        if location.contains(WILDCARD) {
            return Err(Error::invalid_location(location, "wildcard in entry name"));
        }
        for entry in &self.manifest.entries {
            if entry.path == location {
                return Err(Error::AlreadyExists(location.to_string()));
            }
            let nested_under = |outer: &str, inner: &str| {
                inner
                    .strip_prefix(outer)
                    .is_some_and(|rest| rest.starts_with('/'))
            };
            if nested_under(&entry.path, location) || nested_under(location, &entry.path) {
                return Err(Error::invalid_location(
                    location,
                    "conflicts with an existing entry",
                ));
            }
        }
        Ok(())
    }

    fn append(&mut self, location: &str, kind: EntryKind, rows: u64, data: &[u8]) -> Result<()> {
        self.check_location(location)?;
        self.temp.write_all(data)?;
        self.manifest.entries.push(ManifestEntry {
            path: location.to_string(),
            kind,
            offset: self.offset,
            length: data.len() as u64,
            rows,
            sha256: format::digest(data),
        });
        self.offset += data.len() as u64;
        Ok(())
    }

    pub fn write_table(&mut self, location: &str, batch: &RecordBatch) -> Result<()> {
        let data = blob::encode_batch(batch)?;
        self.append(location, EntryKind::Table, batch.num_rows() as u64, &data)?;
        debug!("Wrote table {location} with {rows} rows", location, rows: batch.num_rows());
        Ok(())
    }

    pub fn write_settings(&mut self, location: &str, nested: &NestedNode) -> Result<()> {
        let data = settings::nested::to_string(nested);
        self.append(location, EntryKind::Settings, 0, data.as_bytes())
    }

    /// Write the manifest and move the file into place
    pub fn finish(mut self) -> Result<PathBuf> {
        let manifest = serde_json::to_vec(&self.manifest)?;
        self.temp.write_all(&manifest)?;
        self.temp
            .write_all(&format::encode_trailer(manifest.len() as u64))?;
        self.temp.as_file().sync_all()?;

        let _ = self
            .temp
            .persist(&self.dest)
            .map_err(|e| Error::Io(e.error))?;

        info!(
            "Committed {dest} with {count} entries",
            dest: self.dest.display().to_string(),
            count: self.manifest.entries.len()
        );
        Ok(self.dest)
    }
}

impl SettingsSink for TableFileWriter {
    type Error = Error;

    fn store_settings(&mut self, location: &str, nested: &NestedNode) -> Result<()> {
        self.write_settings(location, nested)
    }
}
