// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::Result;
use selector::{MapperSpec, Pipeline};

use crate::common::RunContext;
use crate::error_utils::ErrorContext;

/// Combine all inputs into one output file
pub fn reduce_command(
    ctx: &RunContext,
    pipeline: &Pipeline,
    mappers: &str,
    output: &Path,
    inputs: &[PathBuf],
) -> Result<()> {
    let spec = MapperSpec::parse(mappers)?;
    pipeline
        .reduce(inputs, &spec, output, &ctx.settings)
        .with_context_fmt("Failed to reduce into", &output.display())?;
    Ok(())
}
