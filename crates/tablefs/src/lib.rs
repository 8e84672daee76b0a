// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Table files for pulse records.
//!
//! A `.tbl` file holds Parquet-encoded tables and settings objects under a
//! `/`-separated in-file namespace. This crate reads and writes those files,
//! expands wildcard paths across many of them, and chains the resulting
//! tables into one logical record stream.

mod blob;
pub mod chain;
mod error;
pub mod expand;
pub mod file;
pub mod format;
pub mod glob;
pub mod tableset;
pub mod writer;

pub use chain::{ChainEntry, TableChain};
pub use error::{Error, Result};
pub use expand::{ConcretePath, PathPattern, expand, expand_each, split_table_path};
pub use file::{Child, ChildKind, TableFile};
pub use format::EXTENSION;
pub use tableset::TableSet;
pub use writer::TableFileWriter;

/// Location of the embedded settings object in output files
pub const SETTINGS_LOCATION: &str = "settings";

#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use std::sync::Arc;

    use arrow_array::{Int32Array, RecordBatch};
    use arrow_schema::{DataType, Field, Schema};

    use crate::writer::TableFileWriter;

    pub fn int_batch(values: &[i32]) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("value", DataType::Int32, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(values.to_vec()))]).unwrap()
    }

    /// Write a file with one single-column table per (location, rows)
    pub fn write_sample(path: &Path, tables: &[(&str, usize)]) {
        let mut writer = TableFileWriter::create(path).unwrap();
        for (location, rows) in tables {
            let values: Vec<i32> = (0..*rows as i32).collect();
            writer.write_table(location, &int_batch(&values)).unwrap();
        }
        writer.finish().unwrap();
    }
}
