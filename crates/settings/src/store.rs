// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, SettingsError};
use crate::nested::{self, NestedNode};
use crate::tree::{NodeKind, Setting, SettingValue, SettingsNode, SettingsTree};
use crate::flat;

/// Rust types that can be stored as a settings leaf
pub trait SettingType: Sized {
    const KIND: NodeKind;

    fn from_value(value: &SettingValue) -> Option<Self>;

    fn into_value(self) -> SettingValue;
}

impl SettingType for bool {
    const KIND: NodeKind = NodeKind::Bool;

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn into_value(self) -> SettingValue {
        SettingValue::Bool(self)
    }
}

impl SettingType for i32 {
    const KIND: NodeKind = NodeKind::Int;

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn into_value(self) -> SettingValue {
        SettingValue::Int(self)
    }
}

impl SettingType for f64 {
    const KIND: NodeKind = NodeKind::Double;

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    fn into_value(self) -> SettingValue {
        SettingValue::Double(self)
    }
}

impl SettingType for String {
    const KIND: NodeKind = NodeKind::String;

    fn from_value(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> SettingValue {
        SettingValue::String(self)
    }
}

/// Something settings can be persisted into, such as an output table file
pub trait SettingsSink {
    type Error: From<SettingsError>;

    fn store_settings(&mut self, location: &str, nested: &NestedNode)
    -> std::result::Result<(), Self::Error>;
}

/// Something settings can be recovered from
pub trait SettingsSource {
    type Error: From<SettingsError>;

    fn load_settings(&self, location: &str)
    -> std::result::Result<Option<NestedNode>, Self::Error>;
}

/// A settings tree with typed, default-recording access.
///
/// One `Settings` value is the context of an invocation: commands receive
/// it explicitly and mapper stages read their parameters from it. Reading a
/// missing key with `save_default` writes the default back, so the tree
/// persisted next to the data records every effective parameter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    tree: SettingsTree,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_tree(tree: SettingsTree) -> Self {
        Self { tree }
    }

    #[must_use]
    pub fn tree(&self) -> &SettingsTree {
        &self.tree
    }

    #[must_use]
    pub fn into_tree(self) -> SettingsTree {
        self.tree
    }

    /// Read `name`, falling back to `default`.
    ///
    /// With `save_default` a missing key is inserted with the default and
    /// flagged as recorded; later reads return the stored value. A leaf of
    /// another type is a [`SettingsError::TypeMismatch`].
    pub fn get<T: SettingType>(&mut self, name: &str, default: T, save_default: bool) -> Result<T> {
        match self.tree.node(name)? {
            Some(SettingsNode::Leaf(leaf)) => {
                T::from_value(&leaf.value).ok_or_else(|| {
                    SettingsError::type_mismatch(name, T::KIND, leaf.value.kind())
                })
            }
            Some(SettingsNode::Branch(_)) => Err(SettingsError::type_mismatch(
                name,
                T::KIND,
                NodeKind::Group,
            )),
            None => {
                if save_default {
                    let value = default.into_value();
                    self.tree
                        .insert(name, Setting::recorded_default(value.clone()))?;
                    diagnostics::debug!("Recorded default for {name}", name);
                    T::from_value(&value)
                        .ok_or_else(|| SettingsError::type_mismatch(name, T::KIND, value.kind()))
                } else {
                    Ok(default)
                }
            }
        }
    }

    /// [`Settings::get`] with `save_default = true`
    pub fn get_or_default<T: SettingType>(&mut self, name: &str, default: T) -> Result<T> {
        self.get(name, default, true)
    }

    /// Read `name` without recording anything
    pub fn lookup<T: SettingType>(&self, name: &str) -> Result<Option<T>> {
        match self.tree.node(name)? {
            None => Ok(None),
            Some(SettingsNode::Leaf(leaf)) => T::from_value(&leaf.value)
                .map(Some)
                .ok_or_else(|| SettingsError::type_mismatch(name, T::KIND, leaf.value.kind())),
            Some(SettingsNode::Branch(_)) => Err(SettingsError::type_mismatch(
                name,
                T::KIND,
                NodeKind::Group,
            )),
        }
    }

    pub fn set<T: SettingType>(&mut self, name: &str, value: T) -> Result<()> {
        self.tree.insert(name, Setting::new(value.into_value()))
    }

    /// Overlay another tree, keeping leaf types stable
    pub fn merge(&mut self, other: &SettingsTree) -> Result<()> {
        self.tree.merge(other)
    }

    /// Swap in a new tree, returning the old one
    pub fn replace(&mut self, tree: SettingsTree) -> SettingsTree {
        std::mem::replace(&mut self.tree, tree)
    }

    /// Write flat `key = value` text
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        flat::write(&self.tree, out)?;
        Ok(())
    }

    #[must_use]
    pub fn export_nested(&self) -> NestedNode {
        nested::export_nested(&self.tree)
    }

    pub fn import_nested(node: &NestedNode) -> Result<Self> {
        Ok(Self::from_tree(nested::import_nested(node)?))
    }

    /// Persist into a container at `location`
    pub fn write_to<S: SettingsSink>(
        &self,
        sink: &mut S,
        location: &str,
    ) -> std::result::Result<(), S::Error> {
        sink.store_settings(location, &self.export_nested())
    }

    /// Recover settings persisted at `location`, if any
    pub fn get_from<S: SettingsSource>(
        source: &S,
        location: &str,
    ) -> std::result::Result<Option<Self>, S::Error> {
        match source.load_settings(location)? {
            Some(node) => Ok(Some(Self::import_nested(&node)?)),
            None => Ok(None),
        }
    }

    /// Load a settings file: `.json` as nested JSON, anything else as flat
    /// text
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let tree = if is_json {
            nested::import_nested(&nested::read(reader)?)?
        } else {
            flat::read(reader)?
        };
        diagnostics::debug!("Loaded {count} settings", count: tree.leaves().len());
        Ok(Self::from_tree(tree))
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&flat::to_string(&self.tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_saved_once() {
        let mut settings = Settings::new();
        assert_eq!(settings.get("x.y", 5, true).unwrap(), 5);

        let leaf = settings.tree().node("x.y").unwrap().cloned();
        assert_eq!(
            leaf,
            Some(SettingsNode::Leaf(Setting::recorded_default(5)))
        );

        // The stored value wins over a different default now.
        assert_eq!(settings.get("x.y", 7, true).unwrap(), 5);
        assert_eq!(settings.get("x.y", 5, true).unwrap(), 5);
        assert_eq!(settings.tree().leaves().len(), 1);
    }

    #[test]
    fn test_default_not_saved() {
        let mut settings = Settings::new();
        assert!(settings.get("flag", true, false).unwrap());
        assert!(settings.tree().is_empty());
    }

    #[test]
    fn test_type_mismatch_is_fatal() {
        let mut settings = Settings::new();
        settings.set("cut.threshold", 2.5).unwrap();
        let err = settings.get("cut.threshold", 3, true).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::TypeMismatch {
                expected: NodeKind::Int,
                found: NodeKind::Double,
                ..
            }
        ));
        assert!(settings.get("cut", 1, true).is_err());
        assert!(settings.lookup::<String>("cut.threshold").is_err());
    }

    #[test]
    fn test_all_types() {
        let mut settings = Settings::new();
        assert!(settings.get_or_default("a.flag", true).unwrap());
        assert_eq!(settings.get_or_default("a.count", -3).unwrap(), -3);
        assert_eq!(settings.get_or_default("a.scale", 0.5).unwrap(), 0.5);
        assert_eq!(
            settings.get_or_default("a.name", "pulse".to_string()).unwrap(),
            "pulse"
        );
        assert_eq!(settings.lookup::<i32>("a.count").unwrap(), Some(-3));
        assert_eq!(settings.lookup::<i32>("a.missing").unwrap(), None);
    }

    #[test]
    fn test_display_is_flat_text() {
        let mut settings = Settings::new();
        settings.set("a.b", 1).unwrap();
        settings.set("c", "x".to_string()).unwrap();
        assert_eq!(settings.to_string(), "a.b = 1\nc = \"x\"\n");
    }

    #[test]
    fn test_replace_and_merge() {
        let mut settings = Settings::new();
        settings.set("a", 1).unwrap();
        let mut other = SettingsTree::new();
        other.insert("b", Setting::new(2)).unwrap();

        let old = settings.replace(other.clone());
        assert_eq!(old.leaves().len(), 1);
        assert_eq!(settings.lookup::<i32>("a").unwrap(), None);

        settings.merge(&old).unwrap();
        assert_eq!(settings.lookup::<i32>("a").unwrap(), Some(1));
        assert_eq!(settings.lookup::<i32>("b").unwrap(), Some(2));
    }

    #[test]
    fn test_load_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let flat_path = dir.path().join("run.conf");
        std::fs::write(&flat_path, "a.b = 3\n").unwrap();
        let json_path = dir.path().join("run.json");
        std::fs::write(&json_path, r#"{"a": {"b": 3}}"#).unwrap();

        let from_flat = Settings::load_file(&flat_path).unwrap();
        let from_json = Settings::load_file(&json_path).unwrap();
        assert_eq!(from_flat, from_json);
    }
}
