// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory Parquet encoding of single record batches.

use std::io::Cursor;

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use bytes::Bytes;
use parquet::arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::file::properties::WriterProperties;

use crate::error::Result;

/// Encode a batch as a complete Parquet file image
pub fn encode_batch(batch: &RecordBatch) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let cursor = Cursor::new(&mut buffer);
        let props = WriterProperties::builder().build();
        let mut writer = ArrowWriter::try_new(cursor, batch.schema(), Some(props))?;
        writer.write(batch)?;
        let _ = writer.close()?;
    }
    Ok(buffer)
}

/// Decode a Parquet image into one batch. An image without row groups
/// decodes to an empty batch of the stored schema.
pub fn decode_batch(data: Bytes) -> Result<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    if batches.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

/// Read only the schema of a Parquet image
pub fn decode_schema(data: Bytes) -> Result<SchemaRef> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(data)?;
    Ok(builder.schema().clone())
}
