// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Built-in generic stages

mod copy;
mod scale;
mod sum;

use arrow_array::RecordBatch;
use tablefs::TableSet;

use crate::error::StageFailure;
use crate::registry::MapperFactory;

pub use copy::CopyMapper;
pub use scale::ScaleMapper;
pub use sum::SumMapper;

/// Factories for every built-in stage
#[must_use]
pub fn builtin() -> Vec<MapperFactory> {
    vec![copy::FACTORY, scale::FACTORY, sum::FACTORY]
}

/// Concatenate the inputs location by location, in input order.
/// Locations appear in the order they are first seen.
pub(crate) fn concat_inputs(inputs: Vec<TableSet>) -> Result<TableSet, StageFailure> {
    let mut grouped: Vec<(String, Vec<RecordBatch>)> = Vec::new();
    for input in inputs {
        for (location, batch) in input {
            match grouped.iter_mut().find(|(l, _)| *l == location) {
                Some((_, batches)) => batches.push(batch),
                None => grouped.push((location, vec![batch])),
            }
        }
    }

    let mut out = TableSet::new();
    for (location, batches) in grouped {
        let schema = batches[0].schema();
        if let Some(other) = batches.iter().find(|b| b.schema() != schema) {
            return Err(StageFailure::failed(format!(
                "inputs disagree on the columns of '{location}': {} vs {}",
                column_list(&batches[0]),
                column_list(other)
            )));
        }
        let batch = arrow::compute::concat_batches(&schema, &batches)?;
        out.insert(location, batch);
    }
    Ok(out)
}

fn column_list(batch: &RecordBatch) -> String {
    let names: Vec<&str> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    format!("[{}]", names.join(", "))
}
