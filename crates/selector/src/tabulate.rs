// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Row dumps of expressions evaluated over a table chain.
//!
//! The column list and selection are SQL fragments evaluated by DataFusion
//! against one constituent table at a time, registered as `t`.

use std::io::Write;
use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_cast::display::{ArrayFormatter, FormatOptions};
use arrow_schema::{Field, Schema, SchemaRef};
use datafusion::datasource::MemTable;
use datafusion::prelude::{SessionConfig, SessionContext};
use diagnostics::*;
use tablefs::TableChain;

use crate::error::*;

const TABLE: &str = "t";

fn query(varexp: &str, selection: &str) -> String {
    if selection.trim().is_empty() {
        format!("SELECT {varexp} FROM {TABLE}")
    } else {
        format!("SELECT {varexp} FROM {TABLE} WHERE {selection}")
    }
}

/// Single partition keeps rows in table order. Identifiers keep their case
/// so mixed-case columns can be named without quoting.
fn context() -> SessionContext {
    let config = SessionConfig::new()
        .with_target_partitions(1)
        .set_bool("datafusion.sql_parser.enable_ident_normalization", false);
    SessionContext::new_with_config(config)
}

async fn run(batch: RecordBatch, sql: &str) -> Result<Vec<RecordBatch>> {
    let ctx = context();
    let table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
    let _ = ctx.register_table(TABLE, Arc::new(table))?;
    let df = ctx.sql(sql).await?;
    Ok(df.collect().await?)
}

/// Every field of every constituent, first occurrence wins
fn union_schema(chain: &TableChain) -> Result<SchemaRef> {
    let mut fields: Vec<Arc<Field>> = Vec::new();
    for index in 0..chain.len() {
        let schema = chain.schema(index)?;
        for field in schema.fields() {
            if !fields.iter().any(|f| f.name() == field.name()) {
                fields.push(field.clone());
            }
        }
    }
    Ok(Arc::new(Schema::new(fields)))
}

/// Result column names, or a schema error when no constituent has a column
/// the expression needs
async fn header(chain: &TableChain, sql: &str) -> Result<Vec<String>> {
    let schema = union_schema(chain)?;
    let ctx = context();
    let _ = ctx.register_table(TABLE, Arc::new(MemTable::try_new(schema, vec![vec![]])?))?;
    match ctx.sql(sql).await {
        Ok(df) => Ok(df
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect()),
        Err(e) if is_missing_column(&e) => Err(Error::Schema(e.find_root().to_string())),
        Err(e) => Err(e.into()),
    }
}

fn write_rows<W: Write>(out: &mut W, batches: &[RecordBatch]) -> Result<u64> {
    let options = FormatOptions::default().with_null("NULL");
    let mut rows = 0u64;
    for batch in batches {
        let formatters = batch
            .columns()
            .iter()
            .map(|c| ArrayFormatter::try_new(c.as_ref(), &options))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(datafusion::error::DataFusionError::from)?;
        for row in 0..batch.num_rows() {
            for (i, formatter) in formatters.iter().enumerate() {
                if i > 0 {
                    write!(out, "\t")?;
                }
                write!(out, "{}", formatter.value(row))?;
            }
            writeln!(out)?;
            rows += 1;
        }
    }
    Ok(rows)
}

/// Evaluate `varexp` over records `[start_entry, start_entry + n_entries)`
/// of `chain` (all remaining when `n_entries` is negative), keep those
/// passing `selection`, and write a header line followed by one
/// tab-separated line per kept record. Returns the number of records
/// written.
///
/// A constituent lacking a column the expression uses contributes no rows;
/// when every constituent lacks it the result is [`Error::Schema`].
pub async fn tabulate<W: Write>(
    chain: &TableChain,
    out: &mut W,
    varexp: &str,
    selection: &str,
    n_entries: i64,
    start_entry: u64,
) -> Result<u64> {
    if chain.is_empty() {
        debug!("Nothing to tabulate, the chain is empty");
        return Ok(0);
    }

    let sql = query(varexp, selection);
    let names = header(chain, &sql).await?;
    writeln!(out, "{}", names.join("\t"))?;

    let total = chain.total_records();
    let end = match u64::try_from(n_entries) {
        Ok(n) => start_entry.saturating_add(n).min(total),
        Err(_) => total,
    };
    if start_entry >= end {
        return Ok(0);
    }

    let mut written = 0u64;
    let mut next_base = 0u64;
    for (index, entry) in chain.entries().iter().enumerate() {
        let base = next_base;
        next_base += entry.rows;
        let lo = start_entry.max(base);
        let hi = end.min(next_base);
        if lo >= hi {
            continue;
        }

        let batch = chain.read(index)?;
        let slice = batch.slice((lo - base) as usize, (hi - lo) as usize);
        match run(slice, &sql).await {
            Ok(batches) => written += write_rows(out, &batches)?,
            Err(Error::Expression(e)) if is_missing_column(&e) => {
                debug!(
                    "{path} lacks a referenced column, skipping",
                    path: entry.path.to_string()
                );
            }
            Err(e) => return Err(e),
        }
    }

    info!("Tabulated {written} rows", written);
    Ok(written)
}
