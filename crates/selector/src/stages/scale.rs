// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use arrow_array::cast::AsArray;
use arrow_array::types::Float64Type;
use arrow_array::{ArrayRef, RecordBatch};
use arrow_schema::DataType;
use diagnostics::*;
use settings::Settings;
use tablefs::TableSet;

use super::concat_inputs;
use crate::error::StageFailure;
use crate::registry::{Mapper, MapperFactory};

pub const FACTORY: MapperFactory = MapperFactory {
    name: "scale",
    description: "Multiply Float64 columns by scale.factor (limited to scale.columns when set)",
    prepare,
};

pub const FACTOR_KEY: &str = "scale.factor";
pub const COLUMNS_KEY: &str = "scale.columns";

fn prepare() -> Result<Arc<dyn Mapper>, StageFailure> {
    Ok(Arc::new(ScaleMapper))
}

#[derive(Debug, Default)]
pub struct ScaleMapper;

fn scale_batch(
    batch: &RecordBatch,
    factor: f64,
    only: Option<&[&str]>,
) -> Result<RecordBatch, StageFailure> {
    let schema = batch.schema();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        let wanted = only.is_none_or(|names| names.contains(&field.name().as_str()));
        let scaled: ArrayRef = match field.data_type() {
            DataType::Float64 if wanted => Arc::new(
                column
                    .as_primitive::<Float64Type>()
                    .unary::<_, Float64Type>(|v| v * factor),
            ),
            other if wanted && only.is_some() => {
                return Err(StageFailure::failed(format!(
                    "column '{}' is {other}, only Float64 columns can be scaled",
                    field.name()
                )));
            }
            _ => column.clone(),
        };
        columns.push(scaled);
    }
    Ok(RecordBatch::try_new(schema, columns)?)
}

impl Mapper for ScaleMapper {
    fn name(&self) -> &str {
        FACTORY.name
    }

    fn apply(&self, inputs: Vec<TableSet>, settings: &mut Settings) -> Result<TableSet, StageFailure> {
        let factor = settings.get_or_default(FACTOR_KEY, 1.0)?;
        let columns = settings.get_or_default(COLUMNS_KEY, String::new())?;
        let only: Option<Vec<&str>> = if columns.trim().is_empty() {
            None
        } else {
            Some(
                columns
                    .split([',', ' '])
                    .filter(|c| !c.is_empty())
                    .collect(),
            )
        };

        let merged = concat_inputs(inputs)?;
        if let Some(names) = &only {
            for name in names {
                let known = merged
                    .iter()
                    .any(|(_, batch)| batch.schema_ref().field_with_name(name).is_ok());
                if !known {
                    return Err(StageFailure::failed(format!("unknown column '{name}'")));
                }
            }
        }

        debug!("Scaling by {factor}", factor);
        let mut out = TableSet::new();
        for (location, batch) in merged.iter() {
            out.insert(location, scale_batch(batch, factor, only.as_deref())?);
        }
        Ok(out)
    }
}
