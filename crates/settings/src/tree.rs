// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The settings tree: ordered branches of typed leaves.
//!
//! Dotted names address the tree, `a.b.c` is the leaf `c` inside branch `b`
//! inside branch `a`. Branches keep insertion order, which is also the
//! serialization order of both codecs.

use std::fmt;

use crate::error::{Result, SettingsError};

/// Separator between segments of a dotted setting name
pub const SEPARATOR: char = '.';

/// Kind of a node, used in type errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Bool,
    Int,
    Double,
    String,
    Group,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Bool => "a bool",
            NodeKind::Int => "an int",
            NodeKind::Double => "a double",
            NodeKind::String => "a string",
            NodeKind::Group => "a group",
        };
        f.write_str(name)
    }
}

/// A typed leaf value
#[derive(Debug, Clone)]
pub enum SettingValue {
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
}

impl SettingValue {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            SettingValue::Bool(_) => NodeKind::Bool,
            SettingValue::Int(_) => NodeKind::Int,
            SettingValue::Double(_) => NodeKind::Double,
            SettingValue::String(_) => NodeKind::String,
        }
    }
}

// Doubles compare by bit pattern so that NaN leaves survive equality checks.
impl PartialEq for SettingValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SettingValue::Bool(a), SettingValue::Bool(b)) => a == b,
            (SettingValue::Int(a), SettingValue::Int(b)) => a == b,
            (SettingValue::Double(a), SettingValue::Double(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (SettingValue::String(a), SettingValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for SettingValue {
    fn from(v: bool) -> Self {
        SettingValue::Bool(v)
    }
}

impl From<i32> for SettingValue {
    fn from(v: i32) -> Self {
        SettingValue::Int(v)
    }
}

impl From<f64> for SettingValue {
    fn from(v: f64) -> Self {
        SettingValue::Double(v)
    }
}

impl From<&str> for SettingValue {
    fn from(v: &str) -> Self {
        SettingValue::String(v.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(v: String) -> Self {
        SettingValue::String(v)
    }
}

/// A leaf: the value and whether it was recorded from a caller default
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub value: SettingValue,
    pub from_default: bool,
}

impl Setting {
    pub fn new<V: Into<SettingValue>>(value: V) -> Self {
        Self {
            value: value.into(),
            from_default: false,
        }
    }

    pub fn recorded_default<V: Into<SettingValue>>(value: V) -> Self {
        Self {
            value: value.into(),
            from_default: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsNode {
    Leaf(Setting),
    Branch(SettingsTree),
}

impl SettingsNode {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            SettingsNode::Leaf(setting) => setting.value.kind(),
            SettingsNode::Branch(_) => NodeKind::Group,
        }
    }
}

/// An ordered branch of named nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsTree {
    entries: Vec<(String, SettingsNode)>,
}

/// Check a single segment of a dotted name
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(SettingsError::invalid_name(segment, "empty segment"));
    }
    if segment.starts_with('$') {
        return Err(SettingsError::invalid_name(segment, "'$' prefix is reserved"));
    }
    if segment
        .chars()
        .any(|c| c == SEPARATOR || c == '=' || c == '#' || c.is_whitespace())
    {
        return Err(SettingsError::invalid_name(
            segment,
            "segments may not contain '.', '=', '#' or whitespace",
        ));
    }
    Ok(())
}

/// Split a dotted name into validated segments
pub fn split_name(name: &str) -> Result<Vec<&str>> {
    if name.is_empty() {
        return Err(SettingsError::invalid_name(name, "empty name"));
    }
    let segments: Vec<&str> = name.split(SEPARATOR).collect();
    for segment in &segments {
        validate_segment(segment).map_err(|_| {
            SettingsError::invalid_name(name, "every dotted segment must be a valid name")
        })?;
    }
    Ok(segments)
}

impl SettingsTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Direct children in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingsNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&SettingsNode> {
        self.entries
            .iter()
            .find(|(name, _)| name == segment)
            .map(|(_, node)| node)
    }

    fn child_mut(&mut self, segment: &str) -> Option<&mut SettingsNode> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == segment)
            .map(|(_, node)| node)
    }

    /// Append or replace a direct child. Used by the importers, which
    /// validate segment names themselves.
    pub(crate) fn put_child(&mut self, segment: String, node: SettingsNode) {
        match self.child_mut(&segment) {
            Some(existing) => *existing = node,
            None => self.entries.push((segment, node)),
        }
    }

    /// Resolve a dotted name to a node.
    ///
    /// `Ok(None)` when any segment is missing; a type error when the path
    /// runs through a leaf.
    pub fn node(&self, name: &str) -> Result<Option<&SettingsNode>> {
        let segments = split_name(name)?;
        let mut branch = self;
        let mut found: Option<&SettingsNode> = None;
        for (depth, segment) in segments.iter().enumerate() {
            if let Some(SettingsNode::Leaf(leaf)) = found {
                return Err(SettingsError::type_mismatch(
                    segments[..depth].join("."),
                    NodeKind::Group,
                    leaf.value.kind(),
                ));
            }
            found = branch.child(segment);
            match found {
                None => return Ok(None),
                Some(SettingsNode::Branch(next)) => branch = next,
                Some(SettingsNode::Leaf(_)) => {}
            }
        }
        Ok(found)
    }

    /// Store a leaf under a dotted name, creating intermediate branches.
    ///
    /// An existing leaf keeps its type: replacing it with a value of another
    /// type is a type error, as is writing through a leaf or over a group.
    pub fn insert(&mut self, name: &str, setting: Setting) -> Result<()> {
        let segments = split_name(name)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| SettingsError::invalid_name(name, "empty name"))?;

        let mut branch = self;
        for (depth, segment) in parents.iter().enumerate() {
            let index = match branch.entries.iter().position(|(n, _)| n == segment) {
                Some(index) => index,
                None => {
                    branch
                        .entries
                        .push(((*segment).to_string(), SettingsNode::Branch(SettingsTree::new())));
                    branch.entries.len() - 1
                }
            };
            branch = match &mut branch.entries[index].1 {
                SettingsNode::Branch(next) => next,
                SettingsNode::Leaf(leaf) => {
                    return Err(SettingsError::type_mismatch(
                        segments[..=depth].join("."),
                        NodeKind::Group,
                        leaf.value.kind(),
                    ));
                }
            };
        }

        match branch.child_mut(last) {
            None => {
                branch
                    .entries
                    .push(((*last).to_string(), SettingsNode::Leaf(setting)));
                Ok(())
            }
            Some(SettingsNode::Leaf(existing)) => {
                if existing.value.kind() != setting.value.kind() {
                    return Err(SettingsError::type_mismatch(
                        name,
                        setting.value.kind(),
                        existing.value.kind(),
                    ));
                }
                *existing = setting;
                Ok(())
            }
            Some(SettingsNode::Branch(_)) => Err(SettingsError::type_mismatch(
                name,
                setting.value.kind(),
                NodeKind::Group,
            )),
        }
    }

    /// All leaves with their dotted names, depth first in insertion order
    #[must_use]
    pub fn leaves(&self) -> Vec<(String, &Setting)> {
        let mut out = Vec::new();
        self.collect_leaves("", &mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Setting)>) {
        for (segment, node) in &self.entries {
            let name = if prefix.is_empty() {
                segment.clone()
            } else {
                format!("{prefix}{SEPARATOR}{segment}")
            };
            match node {
                SettingsNode::Leaf(leaf) => out.push((name, leaf)),
                SettingsNode::Branch(branch) => branch.collect_leaves(&name, out),
            }
        }
    }

    /// Overlay every leaf of `other` onto this tree, with the same type
    /// rules as [`SettingsTree::insert`]. On error the tree is unchanged.
    pub fn merge(&mut self, other: &SettingsTree) -> Result<()> {
        let mut merged = self.clone();
        for (name, leaf) in other.leaves() {
            merged.insert(&name, leaf.clone())?;
        }
        *self = merged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_creates_branches_in_order() {
        let mut tree = SettingsTree::new();
        tree.insert("b.y", Setting::new(1)).unwrap();
        tree.insert("a", Setting::new(true)).unwrap();
        tree.insert("b.x", Setting::new("s")).unwrap();

        let names: Vec<String> = tree.leaves().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b.y", "b.x", "a"]);
    }

    #[test]
    fn test_insert_keeps_type() {
        let mut tree = SettingsTree::new();
        tree.insert("a.b", Setting::new(1)).unwrap();
        tree.insert("a.b", Setting::new(2)).unwrap();
        assert_eq!(
            tree.node("a.b").unwrap(),
            Some(&SettingsNode::Leaf(Setting::new(2)))
        );

        let err = tree.insert("a.b", Setting::new(2.0)).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::TypeMismatch {
                expected: NodeKind::Double,
                found: NodeKind::Int,
                ..
            }
        ));
    }

    #[test]
    fn test_path_through_leaf() {
        let mut tree = SettingsTree::new();
        tree.insert("a", Setting::new(1)).unwrap();
        assert!(matches!(
            tree.insert("a.b", Setting::new(1)),
            Err(SettingsError::TypeMismatch { found: NodeKind::Int, .. })
        ));
        assert!(matches!(
            tree.node("a.b"),
            Err(SettingsError::TypeMismatch { expected: NodeKind::Group, .. })
        ));
    }

    #[test]
    fn test_failed_merge_leaves_tree_unchanged() {
        let mut tree = SettingsTree::new();
        tree.insert("a.x", Setting::new(1)).unwrap();
        tree.insert("a.y", Setting::new(2)).unwrap();
        let before = tree.clone();

        let mut other = SettingsTree::new();
        other.insert("a.x", Setting::new(10)).unwrap();
        other.insert("a.new", Setting::new(true)).unwrap();
        other.insert("a.y", Setting::new("text")).unwrap();

        assert!(matches!(
            tree.merge(&other),
            Err(SettingsError::TypeMismatch { .. })
        ));
        assert_eq!(tree, before);

        other = SettingsTree::new();
        other.insert("a.x", Setting::new(10)).unwrap();
        tree.merge(&other).unwrap();
        assert_eq!(tree.node("a.x").unwrap(), Some(&SettingsNode::Leaf(Setting::new(10))));
    }

    #[test]
    fn test_node_resolution() {
        let mut tree = SettingsTree::new();
        tree.insert("a.b", Setting::new(1)).unwrap();
        assert_eq!(tree.node("a").unwrap().map(SettingsNode::kind), Some(NodeKind::Group));
        assert_eq!(tree.node("a.c").unwrap(), None);
        assert_eq!(tree.node("z.c").unwrap(), None);
    }

    #[test]
    fn test_invalid_names() {
        assert!(split_name("").is_err());
        assert!(split_name("a..b").is_err());
        assert!(split_name("a.$b").is_err());
        assert!(split_name("a b").is_err());
        assert_eq!(split_name("a.b_c-1").unwrap(), vec!["a", "b_c-1"]);
    }

    #[test]
    fn test_nan_leaves_compare_equal() {
        assert_eq!(SettingValue::Double(f64::NAN), SettingValue::Double(f64::NAN));
        assert_ne!(SettingValue::Double(0.0), SettingValue::Double(-0.0));
        assert_ne!(SettingValue::Int(1), SettingValue::Double(1.0));
    }

    #[test]
    fn test_merge_overlays() {
        let mut base = SettingsTree::new();
        base.insert("a.x", Setting::new(1)).unwrap();
        base.insert("a.y", Setting::new("keep")).unwrap();

        let mut overlay = SettingsTree::new();
        overlay.insert("a.x", Setting::new(5)).unwrap();
        overlay.insert("b", Setting::new(false)).unwrap();

        base.merge(&overlay).unwrap();
        assert_eq!(base.leaves().len(), 3);
        assert_eq!(
            base.node("a.x").unwrap(),
            Some(&SettingsNode::Leaf(Setting::new(5)))
        );

        let mut bad = SettingsTree::new();
        bad.insert("a.y", Setting::new(2)).unwrap();
        assert!(base.merge(&bad).is_err());
    }
}
