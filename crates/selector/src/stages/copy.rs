// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use settings::Settings;
use tablefs::TableSet;

use super::concat_inputs;
use crate::error::StageFailure;
use crate::registry::{Mapper, MapperFactory};

pub const FACTORY: MapperFactory = MapperFactory {
    name: "copy",
    description: "Pass records through; several inputs are concatenated per location",
    prepare,
};

fn prepare() -> Result<Arc<dyn Mapper>, StageFailure> {
    Ok(Arc::new(CopyMapper))
}

#[derive(Debug, Default)]
pub struct CopyMapper;

impl Mapper for CopyMapper {
    fn name(&self) -> &str {
        FACTORY.name
    }

    fn apply(
        &self,
        inputs: Vec<TableSet>,
        _settings: &mut Settings,
    ) -> Result<TableSet, StageFailure> {
        concat_inputs(inputs)
    }
}
