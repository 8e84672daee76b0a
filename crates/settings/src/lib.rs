// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Hierarchical, typed settings that travel with the data.
//!
//! A [`Settings`] value wraps a [`SettingsTree`] and offers typed reads that
//! record their defaults. Two serializations are provided: flat dotted-key
//! text ([`flat`]) and nested JSON ([`nested`]).

mod error;
pub mod flat;
pub mod nested;
mod store;
mod tree;

pub use error::{Result, SettingsError};
pub use nested::NestedNode;
pub use store::{SettingType, Settings, SettingsSink, SettingsSource};
pub use tree::{
    NodeKind, SEPARATOR, Setting, SettingValue, SettingsNode, SettingsTree, split_name,
    validate_segment,
};
