// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;

use anyhow::Result;
use diagnostics::*;
use tablefs::TableChain;

use crate::error_utils::ErrorContext;

/// Options for [`tabulate_command`]
#[derive(Debug, Clone)]
pub struct TabulateOptions {
    pub selection: String,
    /// Number of records to scan; negative scans to the end
    pub n_entries: i64,
    pub start_entry: u64,
}

impl Default for TabulateOptions {
    fn default() -> Self {
        Self {
            selection: String::new(),
            n_entries: -1,
            start_entry: 0,
        }
    }
}

/// Print `varexp` for every selected record of the tables matching `path`
pub async fn tabulate_command<W: Write>(
    path: &str,
    varexp: &str,
    options: &TabulateOptions,
    out: &mut W,
) -> Result<u64> {
    let chain = TableChain::from_pattern(path).with_context_fmt("Failed to resolve", &path)?;
    debug!(
        "Chain for {path} has {tables} tables, {records} records",
        path,
        tables: chain.len(),
        records: chain.total_records()
    );
    let rows = selector::tabulate(
        &chain,
        out,
        varexp,
        &options.selection,
        options.n_entries,
        options.start_entry,
    )
    .await?;
    out.flush()?;
    Ok(rows)
}
