// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};

use anyhow::Result;
use diagnostics::*;
use selector::{MapperSpec, Pipeline};

use crate::common::RunContext;
use crate::error_utils::{CommonErrors, ErrorContext};

/// Map one table file into `output`
pub fn map_single_command(
    ctx: &RunContext,
    pipeline: &Pipeline,
    mappers: &str,
    output: &Path,
    input: &Path,
) -> Result<()> {
    let spec = MapperSpec::parse(mappers)?;
    pipeline
        .map_single(input, &spec, output, &ctx.settings)
        .with_context_fmt("Failed to map", &input.display())?;
    Ok(())
}

/// Map every input into its own tagged output, reporting each file
/// through `handler`. Fails when any input failed.
pub async fn map_multi_command<F>(
    ctx: &RunContext,
    pipeline: &Pipeline,
    mappers: &str,
    tag: &str,
    inputs: &[PathBuf],
    reuse_compiled: bool,
    mut handler: F,
) -> Result<()>
where
    F: FnMut(String),
{
    let spec = MapperSpec::parse(mappers)?;
    debug!(
        "Mapping {count} files with {spec}",
        count: inputs.len(),
        spec: spec.to_string()
    );
    let report = pipeline
        .map_multi(inputs, &spec, tag, reuse_compiled, &ctx.settings)
        .await?;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => handler(format!(
                "{} -> {}",
                outcome.input.display(),
                outcome.output.display()
            )),
            Err(e) => handler(format!("{}: {}", outcome.input.display(), e)),
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        return Err(CommonErrors::batch_failed(failed, report.outcomes.len()));
    }
    Ok(())
}
