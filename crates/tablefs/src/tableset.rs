// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use arrow_array::RecordBatch;

use crate::error::*;
use crate::file::TableFile;
use crate::writer::TableFileWriter;

/// Ordered tables keyed by in-file location.
///
/// This is what one input file looks like to a mapper stage, and what a
/// stage hands back to be written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: Vec<(String, RecordBatch)>,
}

impl TableSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every table of a file in manifest order. Settings objects are
    /// not part of a table set.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = TableFile::open(path)?;
        let mut set = Self::new();
        for entry in file.tables() {
            set.tables
                .push((entry.path.clone(), file.read_table(&entry.path)?));
        }
        Ok(set)
    }

    /// Add or replace the table at `location`, keeping its position
    pub fn insert<S: Into<String>>(&mut self, location: S, batch: RecordBatch) {
        let location = location.into();
        match self.tables.iter_mut().find(|(l, _)| *l == location) {
            Some(slot) => slot.1 = batch,
            None => self.tables.push((location, batch)),
        }
    }

    #[must_use]
    pub fn get(&self, location: &str) -> Option<&RecordBatch> {
        self.tables
            .iter()
            .find(|(l, _)| l == location)
            .map(|(_, b)| b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RecordBatch)> {
        self.tables.iter().map(|(l, b)| (l.as_str(), b))
    }

    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(l, _)| l.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, b)| b.num_rows()).sum()
    }

    pub fn write_to(&self, writer: &mut TableFileWriter) -> Result<()> {
        for (location, batch) in &self.tables {
            writer.write_table(location, batch)?;
        }
        Ok(())
    }
}

impl IntoIterator for TableSet {
    type Item = (String, RecordBatch);
    type IntoIter = std::vec::IntoIter<(String, RecordBatch)>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

impl FromIterator<(String, RecordBatch)> for TableSet {
    fn from_iter<I: IntoIterator<Item = (String, RecordBatch)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (location, batch) in iter {
            set.insert(location, batch);
        }
        set
    }
}
