// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::compute::{cast, sum};
use arrow_array::cast::AsArray;
use arrow_array::types::{Float64Type, Int64Type};
use arrow_array::{ArrayRef, Float64Array, Int64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use settings::Settings;
use tablefs::TableSet;

use crate::error::StageFailure;
use crate::registry::{Mapper, MapperFactory};

pub const FACTORY: MapperFactory = MapperFactory {
    name: "sum",
    description: "One row per location with per-column sums and an entries count",
    prepare,
};

/// Column holding the number of records summed
pub const ENTRIES: &str = "entries";

fn prepare() -> Result<Arc<dyn Mapper>, StageFailure> {
    Ok(Arc::new(SumMapper))
}

#[derive(Debug, Default)]
pub struct SumMapper;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Total {
    Int(i64),
    Float(f64),
}

impl Total {
    fn add(self, other: Total) -> Result<Total, StageFailure> {
        match (self, other) {
            (Total::Int(a), Total::Int(b)) => Ok(Total::Int(a.wrapping_add(b))),
            (Total::Float(a), Total::Float(b)) => Ok(Total::Float(a + b)),
            _ => Err(StageFailure::failed(
                "a column is integer in one input and floating-point in another",
            )),
        }
    }
}

/// Per-location running sums. Columns are kept sorted by name so the
/// output does not depend on input order.
#[derive(Debug, Default)]
struct Totals {
    columns: BTreeMap<String, Total>,
    entries: i64,
}

impl Totals {
    fn add_column(&mut self, name: &str, value: Total) -> Result<(), StageFailure> {
        match self.columns.get_mut(name) {
            Some(total) => *total = total.add(value)?,
            None => {
                let _ = self.columns.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    fn add_batch(&mut self, batch: &RecordBatch) -> Result<(), StageFailure> {
        let schema = batch.schema();
        let mut entries = None;
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            let value = match column_sum(column)? {
                Some(value) => value,
                None => continue,
            };
            if field.name() == ENTRIES {
                entries = Some(value);
            } else {
                self.add_column(field.name(), value)?;
            }
        }

        // A previous sum carries its entries; raw records count themselves.
        self.entries += match entries {
            Some(Total::Int(n)) => n,
            Some(Total::Float(_)) => {
                return Err(StageFailure::failed("'entries' column is not an integer"));
            }
            None => batch.num_rows() as i64,
        };
        Ok(())
    }

    fn into_batch(self) -> Result<RecordBatch, StageFailure> {
        let mut fields = Vec::with_capacity(self.columns.len() + 1);
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len() + 1);
        for (name, total) in self.columns {
            match total {
                Total::Int(v) => {
                    fields.push(Field::new(name, DataType::Int64, false));
                    arrays.push(Arc::new(Int64Array::from(vec![v])));
                }
                Total::Float(v) => {
                    fields.push(Field::new(name, DataType::Float64, false));
                    arrays.push(Arc::new(Float64Array::from(vec![v])));
                }
            }
        }
        fields.push(Field::new(ENTRIES, DataType::Int64, false));
        arrays.push(Arc::new(Int64Array::from(vec![self.entries])));
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }
}

/// Sum of a numeric column; `None` for columns that are not summed
fn column_sum(column: &ArrayRef) -> Result<Option<Total>, StageFailure> {
    let total = match column.data_type() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let wide = cast(column, &DataType::Int64)?;
            Total::Int(sum(wide.as_primitive::<Int64Type>()).unwrap_or(0))
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let wide = cast(column, &DataType::Float64)?;
            Total::Float(sum(wide.as_primitive::<Float64Type>()).unwrap_or(0.0))
        }
        _ => return Ok(None),
    };
    Ok(Some(total))
}

impl Mapper for SumMapper {
    fn name(&self) -> &str {
        FACTORY.name
    }

    fn apply(
        &self,
        inputs: Vec<TableSet>,
        _settings: &mut Settings,
    ) -> Result<TableSet, StageFailure> {
        // Locations come out sorted, whatever order the inputs list them in.
        let mut by_location: BTreeMap<String, Totals> = BTreeMap::new();
        for input in &inputs {
            for (location, batch) in input.iter() {
                by_location
                    .entry(location.to_string())
                    .or_default()
                    .add_batch(batch)?;
            }
        }

        let mut out = TableSet::new();
        for (location, totals) in by_location {
            out.insert(location, totals.into_batch()?);
        }
        Ok(out)
    }
}
