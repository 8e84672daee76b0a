// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use diagnostics::*;

use crate::error::*;
use crate::expand::{ConcretePath, expand_each};
use crate::file::{ChildKind, TableFile};

/// One constituent table of a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub path: ConcretePath,
    pub rows: u64,
}

/// Many tables read as one record stream.
///
/// Only manifests are consulted while building; table data is loaded one
/// constituent at a time through [`TableChain::read`].
#[derive(Debug, Clone, Default)]
pub struct TableChain {
    entries: Vec<ChainEntry>,
}

impl TableChain {
    /// Build from concrete paths, skipping groups and settings objects
    pub fn from_paths<I: IntoIterator<Item = ConcretePath>>(paths: I) -> Result<Self> {
        let mut chain = Self::default();
        let mut open: Option<TableFile> = None;
        for path in paths {
            chain.push(&mut open, path)?;
        }
        debug!("Built chain of {count} tables", count: chain.entries.len());
        Ok(chain)
    }

    /// Expand a pattern and chain every table it names
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        let mut chain = Self::default();
        let mut open: Option<TableFile> = None;
        expand_each(pattern, |path| chain.push(&mut open, path))?;
        info!(
            "Chain for {pattern} has {count} tables, {records} records",
            pattern,
            count: chain.entries.len(),
            records: chain.total_records()
        );
        Ok(chain)
    }

    // Consecutive paths usually share a file, so the last one stays open.
    fn push(&mut self, open: &mut Option<TableFile>, path: ConcretePath) -> Result<()> {
        if path.kind != ChildKind::Table {
            debug!("Skipping {path} ({kind})", path: path.to_string(), kind: path.kind.to_string());
            return Ok(());
        }
        let reuse = open.as_ref().is_some_and(|f| f.path() == path.file);
        if !reuse {
            *open = Some(TableFile::open(&path.file)?);
        }
        let rows = match open.as_ref() {
            Some(file) => file.rows(&path.location)?,
            None => return Err(Error::not_found(&path.file, &path.location)),
        };
        self.entries.push(ChainEntry { path, rows });
        Ok(())
    }

    #[must_use]
    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.entries.iter().map(|e| e.rows).sum()
    }

    fn entry(&self, index: usize) -> Result<&ChainEntry> {
        self.entries
            .get(index)
            .ok_or_else(|| Error::invalid_location(index.to_string(), "chain index out of range"))
    }

    /// Load the table of constituent `index`
    pub fn read(&self, index: usize) -> Result<RecordBatch> {
        let entry = self.entry(index)?;
        TableFile::open(&entry.path.file)?.read_table(&entry.path.location)
    }

    pub fn schema(&self, index: usize) -> Result<SchemaRef> {
        let entry = self.entry(index)?;
        TableFile::open(&entry.path.file)?.read_schema(&entry.path.location)
    }

    /// Map a global record number to (constituent index, local row)
    #[must_use]
    pub fn locate(&self, global: u64) -> Option<(usize, u64)> {
        let mut base = 0u64;
        for (index, entry) in self.entries.iter().enumerate() {
            if global < base + entry.rows {
                return Some((index, global - base));
            }
            base += entry.rows;
        }
        None
    }
}
