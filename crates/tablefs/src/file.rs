// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use bytes::Bytes;
use settings::{NestedNode, SettingsSource};

use crate::blob;
use crate::error::*;
use crate::format::{self, EntryKind, MAGIC, Manifest, ManifestEntry, TRAILER_LEN};

/// What lives at an in-file location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Group,
    Table,
    Settings,
}

impl From<EntryKind> for ChildKind {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::Table => ChildKind::Table,
            EntryKind::Settings => ChildKind::Settings,
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKind::Group => write!(f, "group"),
            ChildKind::Table => write!(f, "table"),
            ChildKind::Settings => write!(f, "settings"),
        }
    }
}

/// A direct child of an in-file location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub name: String,
    pub kind: ChildKind,
}

/// Read handle on a `.tbl` file.
///
/// Opening reads only the manifest; blobs are fetched on demand and
/// verified against their digest.
pub struct TableFile {
    path: PathBuf,
    file: File,
    manifest: Manifest,
}

impl fmt::Debug for TableFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFile")
            .field("path", &self.path)
            .field("entries", &self.manifest.entries.len())
            .finish()
    }
}

impl TableFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let size = file.metadata()?.len();

        let min_size = (MAGIC.len() + TRAILER_LEN) as u64;
        if size < min_size {
            return Err(Error::corrupt(&path, "file too short"));
        }

        let mut head = [0u8; 8];
        file.read_exact(&mut head)?;
        if &head != MAGIC {
            return Err(Error::corrupt(&path, "missing leading magic"));
        }

        let mut trailer = [0u8; TRAILER_LEN];
        let _ = file.seek(SeekFrom::Start(size - TRAILER_LEN as u64))?;
        file.read_exact(&mut trailer)?;
        let manifest_len = format::decode_trailer(&trailer)
            .ok_or_else(|| Error::corrupt(&path, "missing trailing magic"))?;
        if manifest_len > size - min_size {
            return Err(Error::corrupt(&path, "manifest length out of range"));
        }

        let manifest_start = size - TRAILER_LEN as u64 - manifest_len;
        let _ = file.seek(SeekFrom::Start(manifest_start))?;
        let mut raw = vec![0u8; manifest_len as usize];
        file.read_exact(&mut raw)?;
        let manifest: Manifest = serde_json::from_slice(&raw)
            .map_err(|e| Error::corrupt(&path, format!("bad manifest: {e}")))?;

        for entry in &manifest.entries {
            if entry.offset < MAGIC.len() as u64
                || entry.offset.saturating_add(entry.length) > manifest_start
            {
                return Err(Error::corrupt(
                    &path,
                    format!("entry '{}' lies outside the blob area", entry.path),
                ));
            }
        }

        diagnostics::debug!(
            "Opened table file {path} with {count} entries",
            path: path.display().to_string(),
            count: manifest.entries.len()
        );
        Ok(Self {
            path,
            file,
            manifest,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The manifest entry stored at exactly `location`
    pub fn entry(&self, location: &str) -> Result<&ManifestEntry> {
        self.manifest
            .find(location)
            .ok_or_else(|| Error::not_found(&self.path, location))
    }

    /// Kind of the node at `location`, or `None` when nothing is there.
    /// The empty location is the root group.
    #[must_use]
    pub fn kind_of(&self, location: &str) -> Option<ChildKind> {
        if location.is_empty() {
            return Some(ChildKind::Group);
        }
        if let Some(entry) = self.manifest.find(location) {
            return Some(entry.kind.into());
        }
        let prefix = format!("{location}/");
        self.manifest
            .entries
            .iter()
            .any(|e| e.path.starts_with(&prefix))
            .then_some(ChildKind::Group)
    }

    /// Direct children of `location` in first-appearance order
    #[must_use]
    pub fn children(&self, location: &str) -> Vec<Child> {
        let prefix = if location.is_empty() {
            String::new()
        } else {
            format!("{location}/")
        };

        let mut children: Vec<Child> = Vec::new();
        for entry in &self.manifest.entries {
            let Some(rest) = entry.path.strip_prefix(&prefix) else {
                continue;
            };
            let (name, kind) = match rest.split_once('/') {
                Some((name, _)) => (name, ChildKind::Group),
                None => (rest, entry.kind.into()),
            };
            if !children.iter().any(|c| c.name == name) {
                children.push(Child {
                    name: name.to_string(),
                    kind,
                });
            }
        }
        children
    }

    /// Table entries in manifest order
    pub fn tables(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.manifest
            .entries
            .iter()
            .filter(|e| e.kind == EntryKind::Table)
    }

    fn read_blob(&self, entry: &ManifestEntry) -> Result<Bytes> {
        let mut file = &self.file;
        let _ = file.seek(SeekFrom::Start(entry.offset))?;
        let mut data = vec![0u8; entry.length as usize];
        file.read_exact(&mut data)?;

        if format::digest(&data) != entry.sha256 {
            return Err(Error::corrupt(
                &self.path,
                format!("checksum mismatch for '{}'", entry.path),
            ));
        }
        Ok(Bytes::from(data))
    }

    fn table_entry(&self, location: &str) -> Result<&ManifestEntry> {
        let entry = self.entry(location)?;
        if entry.kind != EntryKind::Table {
            return Err(Error::invalid_location(location, "not a table"));
        }
        Ok(entry)
    }

    /// Decode a table. The row count must agree with the manifest.
    pub fn read_table(&self, location: &str) -> Result<RecordBatch> {
        let entry = self.table_entry(location)?;
        let batch = blob::decode_batch(self.read_blob(entry)?)?;
        if batch.num_rows() as u64 != entry.rows {
            return Err(Error::corrupt(
                &self.path,
                format!(
                    "{location} has {} rows, manifest records {}",
                    batch.num_rows(),
                    entry.rows
                ),
            ));
        }
        Ok(batch)
    }

    pub fn read_schema(&self, location: &str) -> Result<SchemaRef> {
        let entry = self.table_entry(location)?;
        blob::decode_schema(self.read_blob(entry)?)
    }

    /// Row count recorded in the manifest
    pub fn rows(&self, location: &str) -> Result<u64> {
        Ok(self.table_entry(location)?.rows)
    }

    pub fn read_settings(&self, location: &str) -> Result<NestedNode> {
        let entry = self.entry(location)?;
        if entry.kind != EntryKind::Settings {
            return Err(Error::invalid_location(location, "not a settings object"));
        }
        let data = self.read_blob(entry)?;
        Ok(settings::nested::read(data.as_ref())?)
    }
}

impl SettingsSource for TableFile {
    type Error = Error;

    fn load_settings(&self, location: &str) -> Result<Option<NestedNode>> {
        match self.manifest.find(location) {
            None => Ok(None),
            Some(_) => self.read_settings(location).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{int_batch, write_sample};
    use crate::writer::TableFileWriter;
    use settings::Settings;

    #[test]
    fn test_children_and_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run1.tbl");
        write_sample(&path, &[("evt/ch0", 3), ("evt/ch1", 2), ("meta/info", 1)]);

        let file = TableFile::open(&path).unwrap();
        let root: Vec<_> = file.children("").into_iter().map(|c| c.name).collect();
        assert_eq!(root, vec!["evt", "meta"]);

        let evt = file.children("evt");
        assert_eq!(evt.len(), 2);
        assert_eq!(evt[0].name, "ch0");
        assert_eq!(evt[0].kind, ChildKind::Table);

        assert_eq!(file.kind_of("evt"), Some(ChildKind::Group));
        assert_eq!(file.kind_of("evt/ch1"), Some(ChildKind::Table));
        assert_eq!(file.kind_of("ev"), None);
        assert!(file.children("evt/ch0").is_empty());

        assert_eq!(file.read_table("evt/ch0").unwrap().num_rows(), 3);
        assert_eq!(file.rows("evt/ch1").unwrap(), 2);
        assert!(matches!(file.read_table("evt/ch9"), Err(Error::NotFound { .. })));
        assert!(matches!(file.read_table("evt"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_settings_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.tbl");

        let mut settings = Settings::new();
        settings.set("scale.factor", 2.5).unwrap();
        settings.set("scale.columns", "energy".to_string()).unwrap();

        let mut writer = TableFileWriter::create(&path).unwrap();
        writer.write_table("evt", &int_batch(&[1, 2])).unwrap();
        settings.write_to(&mut writer, "settings").unwrap();
        writer.finish().unwrap();

        let file = TableFile::open(&path).unwrap();
        assert_eq!(file.kind_of("settings"), Some(ChildKind::Settings));
        let loaded = Settings::get_from(&file, "settings").unwrap().unwrap();
        assert_eq!(loaded, settings);
        assert!(Settings::get_from(&file, "other").unwrap().is_none());
        assert!(Settings::get_from(&file, "evt").is_err());
    }

    #[test]
    fn test_corruption_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tbl");
        write_sample(&path, &[("evt", 4)]);

        // Flip a byte inside the first blob.
        let mut raw = std::fs::read(&path).unwrap();
        raw[MAGIC.len() + 4] ^= 0xff;
        std::fs::write(&path, &raw).unwrap();

        let file = TableFile::open(&path).unwrap();
        assert!(matches!(file.read_table("evt"), Err(Error::Corrupt { .. })));

        std::fs::write(&path, b"not a table file at all").unwrap();
        assert!(matches!(TableFile::open(&path), Err(Error::Corrupt { .. })));
    }

    #[test]
    fn test_row_count_mismatch_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.tbl");
        write_sample(&path, &[("evt", 4)]);

        // Same length, so every offset stays valid.
        let mut raw = std::fs::read(&path).unwrap();
        let needle = br#""rows":4"#;
        let at = raw
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap();
        raw[at + needle.len() - 1] = b'5';
        std::fs::write(&path, &raw).unwrap();

        let file = TableFile::open(&path).unwrap();
        assert_eq!(file.rows("evt").unwrap(), 5);
        assert!(matches!(file.read_table("evt"), Err(Error::Corrupt { .. })));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.tbl");
        std::fs::write(&path, b"not a table file at all").unwrap();
        assert!(matches!(TableFile::open(&path), Err(Error::Corrupt { .. })));
    }
}
