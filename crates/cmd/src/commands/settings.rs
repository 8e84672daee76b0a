// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::{BufReader, Read};

use anyhow::Result;
use diagnostics::*;
use settings::{Settings, flat, nested};
use tablefs::TableFile;

use crate::common::{RunContext, SettingsInput};
use crate::error_utils::{CommonErrors, ErrorContext};

fn read_input<R: Read>(input: &SettingsInput, json_output: bool, stdin: R) -> Result<Settings> {
    match input {
        SettingsInput::Embedded { file, location } => {
            let display = file.display().to_string();
            let table = TableFile::open(file).table_context("open", &display)?;
            Settings::get_from(&table, location)
                .table_context("read settings from", &display)?
                .ok_or_else(|| CommonErrors::no_embedded_settings(&display, location))
        }
        SettingsInput::Flat(path) | SettingsInput::Json(path) => {
            let display = path.display().to_string();
            Settings::load_file(path).file_context("read settings from", &display)
        }
        // Stdin is read as the format being converted from.
        SettingsInput::Stdin if json_output => {
            let tree = flat::read(BufReader::new(stdin)).settings_context("parse flat")?;
            Ok(Settings::from_tree(tree))
        }
        SettingsInput::Stdin => {
            let node = nested::read(stdin).settings_context("parse JSON")?;
            Settings::import_nested(&node).settings_context("import JSON")
        }
    }
}

/// Render settings as flat text, or as JSON with `json_output`
pub fn render(settings: &Settings, json_output: bool) -> String {
    if json_output {
        let mut text = nested::to_string(&settings.export_nested());
        text.push('\n');
        text
    } else {
        settings.to_string()
    }
}

/// Print settings from `input`, or the ambient settings when no input is
/// given
pub fn settings_command<R, F>(
    ctx: &RunContext,
    input: Option<&str>,
    json_output: bool,
    stdin: R,
    mut handler: F,
) -> Result<()>
where
    R: Read,
    F: FnMut(String),
{
    let settings = match input {
        None => ctx.settings.clone(),
        Some(input) => {
            let source = SettingsInput::parse(input)?;
            debug!("Reading settings from {input}", input);
            read_input(&source, json_output, stdin)?
        }
    };
    handler(render(&settings, json_output));
    Ok(())
}
