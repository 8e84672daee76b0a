// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::path::{Path, PathBuf};

use anyhow::Result;
use diagnostics::*;
use settings::Settings;

use crate::error_utils::{CommonErrors, ErrorContext};

/// Environment variable naming the ambient settings file
pub const SETTINGS_ENV: &str = "PULSEMAP_SETTINGS";

/// State shared by every command of one invocation
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Settings every command starts from
    pub settings: Settings,
}

impl RunContext {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Load the ambient settings from `override_path`, else from the file
    /// named by `PULSEMAP_SETTINGS`; with neither they start empty
    pub fn load(override_path: Option<PathBuf>) -> Result<Self> {
        Ok(Self::new(load_settings_with_override(override_path)?))
    }
}

/// Ambient settings path with an optional override, falling back to
/// `PULSEMAP_SETTINGS`
#[must_use]
pub fn get_settings_path_with_override(override_path: Option<PathBuf>) -> Option<PathBuf> {
    override_path.or_else(|| {
        env::var(SETTINGS_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

/// Load the ambient settings; an unset path gives an empty tree
pub fn load_settings_with_override(override_path: Option<PathBuf>) -> Result<Settings> {
    match get_settings_path_with_override(override_path) {
        Some(path) => {
            let display = path.display().to_string();
            let settings = Settings::load_file(&path).file_context("load settings from", &display)?;
            debug!("Loaded ambient settings from {path}", path: display);
            Ok(settings)
        }
        None => Ok(Settings::new()),
    }
}

/// Where a `settings` command reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsInput {
    /// Settings object inside a table file
    Embedded { file: PathBuf, location: String },
    /// Flat `key = value` text file
    Flat(PathBuf),
    /// Nested JSON file
    Json(PathBuf),
    /// Standard input; flat text when converting to JSON, JSON otherwise
    Stdin,
}

impl SettingsInput {
    /// Classify an input argument by its extension
    pub fn parse(input: &str) -> Result<Self> {
        if input == "-" {
            return Ok(SettingsInput::Stdin);
        }
        if let Some((file, location)) = tablefs::split_table_path(input) {
            let location = if location.is_empty() {
                tablefs::SETTINGS_LOCATION.to_string()
            } else {
                location
            };
            return Ok(SettingsInput::Embedded { file, location });
        }
        let path = Path::new(input);
        match path.extension().and_then(|e| e.to_str()) {
            Some("conf") => Ok(SettingsInput::Flat(path.to_path_buf())),
            Some("json") => Ok(SettingsInput::Json(path.to_path_buf())),
            _ => Err(CommonErrors::unknown_extension(input)),
        }
    }
}
