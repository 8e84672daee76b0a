// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Nested representation of a settings tree and its JSON text form.
//!
//! JSON has no spelling for non-finite numbers, so NaN and the infinities
//! are written as a one-key object `{"$double": "NaN"}` (or `"Infinity"`,
//! `"-Infinity"`). A leaf recorded from a caller default is wrapped as
//! `{"$default": <value>}`. Segment names may not start with `$`, which
//! keeps both sentinels unambiguous.

use std::io::{Read, Write};

use serde_json::{Map, Number, Value};

use crate::error::{Result, SettingsError};
use crate::tree::{Setting, SettingValue, SettingsNode, SettingsTree, validate_segment};

const DOUBLE_SENTINEL: &str = "$double";
const DEFAULT_SENTINEL: &str = "$default";
const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

/// A node graph isomorphic to a [`SettingsTree`]
#[derive(Debug, Clone, PartialEq)]
pub enum NestedNode {
    Branch(Vec<(String, NestedNode)>),
    Value(Setting),
}

#[must_use]
pub fn export_nested(tree: &SettingsTree) -> NestedNode {
    NestedNode::Branch(
        tree.iter()
            .map(|(name, node)| {
                let nested = match node {
                    SettingsNode::Leaf(leaf) => NestedNode::Value(leaf.clone()),
                    SettingsNode::Branch(branch) => export_nested(branch),
                };
                (name.to_string(), nested)
            })
            .collect(),
    )
}

/// Rebuild a tree. The root must be a branch.
pub fn import_nested(node: &NestedNode) -> Result<SettingsTree> {
    match node {
        NestedNode::Branch(children) => import_branch(children, ""),
        NestedNode::Value(leaf) => Err(SettingsError::Unsupported {
            path: String::new(),
            found: format!("{} at the root", leaf.value.kind()),
        }),
    }
}

fn import_branch(children: &[(String, NestedNode)], prefix: &str) -> Result<SettingsTree> {
    let mut tree = SettingsTree::new();
    for (name, child) in children {
        let path = join(prefix, name);
        validate_segment(name).map_err(|_| {
            SettingsError::invalid_name(path.clone(), "not a valid settings segment")
        })?;
        let node = match child {
            NestedNode::Value(leaf) => SettingsNode::Leaf(leaf.clone()),
            NestedNode::Branch(grandchildren) => {
                SettingsNode::Branch(import_branch(grandchildren, &path)?)
            }
        };
        tree.put_child(name.clone(), node);
    }
    Ok(tree)
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn sentinel(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    let _ = map.insert(key.to_string(), value);
    Value::Object(map)
}

fn value_to_json(value: &SettingValue) -> Value {
    match value {
        SettingValue::Bool(v) => Value::Bool(*v),
        SettingValue::Int(v) => Value::Number(Number::from(*v)),
        SettingValue::Double(v) => match Number::from_f64(*v) {
            Some(number) => Value::Number(number),
            None => {
                let token = if v.is_nan() {
                    NAN
                } else if v.is_sign_positive() {
                    INFINITY
                } else {
                    NEG_INFINITY
                };
                sentinel(DOUBLE_SENTINEL, Value::String(token.to_string()))
            }
        },
        SettingValue::String(v) => Value::String(v.clone()),
    }
}

/// Convert to a JSON value, mapping non-finite doubles and recorded
/// defaults to sentinels
#[must_use]
pub fn to_json(node: &NestedNode) -> Value {
    match node {
        NestedNode::Branch(children) => {
            let mut map = Map::new();
            for (name, child) in children {
                let _ = map.insert(name.clone(), to_json(child));
            }
            Value::Object(map)
        }
        NestedNode::Value(leaf) if leaf.from_default => {
            sentinel(DEFAULT_SENTINEL, value_to_json(&leaf.value))
        }
        NestedNode::Value(leaf) => value_to_json(&leaf.value),
    }
}

/// Convert from a JSON value. Nulls and arrays have no settings
/// counterpart and are rejected.
pub fn from_json(value: &Value) -> Result<NestedNode> {
    from_json_at(value, "")
}

fn from_json_at(value: &Value, path: &str) -> Result<NestedNode> {
    let unsupported = |found: &str| SettingsError::Unsupported {
        path: path.to_string(),
        found: found.to_string(),
    };

    if let Value::Object(map) = value {
        if let Some(inner) = map.get(DEFAULT_SENTINEL) {
            if map.len() != 1 {
                return Err(unsupported("'$default' mixed with other keys"));
            }
            let v = value_from_json(inner, path)?;
            return Ok(NestedNode::Value(Setting::recorded_default(v)));
        }
    }

    match value {
        Value::Object(map) if !map.contains_key(DOUBLE_SENTINEL) => {
            let children = map
                .iter()
                .map(|(name, child)| Ok((name.clone(), from_json_at(child, &join(path, name))?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(NestedNode::Branch(children))
        }
        _ => value_from_json(value, path).map(|v| NestedNode::Value(Setting::new(v))),
    }
}

/// A single leaf value: a scalar or a `$double` sentinel
fn value_from_json(value: &Value, path: &str) -> Result<SettingValue> {
    let unsupported = |found: &str| SettingsError::Unsupported {
        path: path.to_string(),
        found: found.to_string(),
    };

    match value {
        Value::Bool(v) => Ok(SettingValue::Bool(*v)),
        Value::String(v) => Ok(SettingValue::String(v.clone())),
        Value::Number(number) => {
            if let Some(v) = number.as_i64() {
                match i32::try_from(v) {
                    Ok(v) if !number.is_f64() => Ok(SettingValue::Int(v)),
                    _ => Ok(SettingValue::Double(v as f64)),
                }
            } else {
                number
                    .as_f64()
                    .map(SettingValue::Double)
                    .ok_or_else(|| unsupported("unrepresentable number"))
            }
        }
        Value::Object(map) => {
            let Some(sentinel) = map.get(DOUBLE_SENTINEL) else {
                return Err(unsupported("group where a value is expected"));
            };
            if map.len() != 1 {
                return Err(unsupported("'$double' mixed with other keys"));
            }
            match sentinel.as_str() {
                Some(NAN) => Ok(SettingValue::Double(f64::NAN)),
                Some(INFINITY) => Ok(SettingValue::Double(f64::INFINITY)),
                Some(NEG_INFINITY) => Ok(SettingValue::Double(f64::NEG_INFINITY)),
                _ => Err(unsupported("unknown '$double' token")),
            }
        }
        Value::Null => Err(unsupported("null")),
        Value::Array(_) => Err(unsupported("array")),
    }
}

/// Emit pretty-printed JSON (no trailing newline)
pub fn write<W: Write>(out: W, node: &NestedNode) -> Result<()> {
    serde_json::to_writer_pretty(out, &to_json(node))?;
    Ok(())
}

#[must_use]
pub fn to_string(node: &NestedNode) -> String {
    serde_json::to_string_pretty(&to_json(node)).unwrap_or_default()
}

/// Parse JSON text. Syntax errors carry line and column.
pub fn read<R: Read>(input: R) -> Result<NestedNode> {
    let value: Value = serde_json::from_reader(input)?;
    from_json(&value)
}

pub fn parse(text: &str) -> Result<NestedNode> {
    read(text.as_bytes())
}
