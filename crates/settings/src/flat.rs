// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Flat `key = value` text, one dotted key per line.
//!
//! Values carry their type in their spelling: `true`/`false`, integers,
//! doubles that always show a fraction, exponent or special name (`5.0`,
//! `1e300`, `NaN`, `inf`), and JSON-quoted strings. Unquoted values that are
//! neither bool nor number read back as strings.

use std::io::{BufRead, Write};

use crate::error::{Result, SettingsError};
use crate::tree::{Setting, SettingValue, SettingsTree, split_name};

/// Spell a value so that it reads back with the same type
#[must_use]
pub fn format_value(value: &SettingValue) -> String {
    match value {
        SettingValue::Bool(v) => v.to_string(),
        SettingValue::Int(v) => v.to_string(),
        // Debug keeps ".0" on integral doubles and uses NaN/inf/-inf.
        SettingValue::Double(v) => format!("{v:?}"),
        SettingValue::String(v) => {
            serde_json::to_string(v).unwrap_or_else(|_| format!("\"{}\"", v.escape_default()))
        }
    }
}

/// Parse the right-hand side of a line
pub fn parse_value(raw: &str, line: usize, column: usize) -> Result<SettingValue> {
    if raw.starts_with('"') {
        return serde_json::from_str::<String>(raw)
            .map(SettingValue::String)
            .map_err(|e| SettingsError::parse(line, column, format!("bad string literal: {e}")));
    }
    match raw {
        "true" => return Ok(SettingValue::Bool(true)),
        "false" => return Ok(SettingValue::Bool(false)),
        _ => {}
    }
    if let Ok(v) = raw.parse::<i32>() {
        return Ok(SettingValue::Int(v));
    }
    if let Ok(v) = raw.parse::<f64>() {
        return Ok(SettingValue::Double(v));
    }
    Ok(SettingValue::String(raw.to_string()))
}

pub fn write<W: Write>(tree: &SettingsTree, out: &mut W) -> std::io::Result<()> {
    for (name, leaf) in tree.leaves() {
        writeln!(out, "{} = {}", name, format_value(&leaf.value))?;
    }
    Ok(())
}

#[must_use]
pub fn to_string(tree: &SettingsTree) -> String {
    let mut out = String::new();
    for (name, leaf) in tree.leaves() {
        out.push_str(&name);
        out.push_str(" = ");
        out.push_str(&format_value(&leaf.value));
        out.push('\n');
    }
    out
}

/// Read flat text. Blank lines and `#` comments are skipped; a repeated key
/// overwrites the earlier value if the type agrees.
pub fn read<R: BufRead>(input: R) -> Result<SettingsTree> {
    let mut tree = SettingsTree::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - trimmed.len();

        let eq = trimmed
            .find('=')
            .ok_or_else(|| SettingsError::parse(number, indent + 1, "expected 'key = value'"))?;
        let key = trimmed[..eq].trim_end();
        if split_name(key).is_err() {
            return Err(SettingsError::parse(
                number,
                indent + 1,
                format!("invalid key '{key}'"),
            ));
        }

        let rest = &trimmed[eq + 1..];
        let value_raw = rest.trim();
        let value_column = indent + eq + 2 + (rest.len() - rest.trim_start().len());
        let value = parse_value(value_raw, number, value_column)?;

        tree.insert(key, Setting::new(value))?;
    }
    Ok(tree)
}

pub fn parse(text: &str) -> Result<SettingsTree> {
    read(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SettingsNode;

    fn value_of(tree: &SettingsTree, name: &str) -> SettingValue {
        match tree.node(name).unwrap() {
            Some(SettingsNode::Leaf(leaf)) => leaf.value.clone(),
            other => panic!("expected leaf at {name}, got {other:?}"),
        }
    }

    #[test]
    fn test_value_spelling() {
        assert_eq!(format_value(&SettingValue::Double(5.0)), "5.0");
        assert_eq!(format_value(&SettingValue::Double(f64::NAN)), "NaN");
        assert_eq!(format_value(&SettingValue::Double(f64::NEG_INFINITY)), "-inf");
        assert_eq!(format_value(&SettingValue::Int(-12)), "-12");
        assert_eq!(
            format_value(&SettingValue::String("a \"b\"".to_string())),
            r#""a \"b\"""#
        );
    }

    #[test]
    fn test_parse_types() {
        let tree = parse(
            "# detector setup\n\
             det.enabled = true\n\
             det.channels = 16\n\
             det.gain = 2.0\n\
             det.limit = inf\n\
             det.big = 3000000000\n\
             \n\
             det.label = \"12\"\n\
             det.mode = fast\n",
        )
        .unwrap();

        assert_eq!(value_of(&tree, "det.enabled"), SettingValue::Bool(true));
        assert_eq!(value_of(&tree, "det.channels"), SettingValue::Int(16));
        assert_eq!(value_of(&tree, "det.gain"), SettingValue::Double(2.0));
        assert_eq!(value_of(&tree, "det.limit"), SettingValue::Double(f64::INFINITY));
        assert_eq!(value_of(&tree, "det.big"), SettingValue::Double(3e9));
        assert_eq!(value_of(&tree, "det.label"), SettingValue::String("12".to_string()));
        assert_eq!(value_of(&tree, "det.mode"), SettingValue::String("fast".to_string()));
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut tree = SettingsTree::new();
        tree.insert("b.x", Setting::new(-0.0)).unwrap();
        tree.insert("a", Setting::new(f64::NAN)).unwrap();
        tree.insert("b.y", Setting::new("line\nbreak = \"q\"")).unwrap();
        tree.insert("b.z", Setting::new("true")).unwrap();

        let text = to_string(&tree);
        assert_eq!(parse(&text).unwrap(), tree);

        let mut buf = Vec::new();
        write(&tree, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), text);
    }

    #[test]
    fn test_parse_errors_have_positions() {
        match parse("a = 1\n  broken line\n") {
            Err(SettingsError::Parse { line, column, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(column, 3);
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        match parse("a = \"unterminated\n") {
            Err(SettingsError::Parse { line, column, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 5);
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        assert!(matches!(
            parse("a b = 1\n"),
            Err(SettingsError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_type_change_in_file_is_rejected() {
        assert!(matches!(
            parse("a = 1\na = \"x\"\n"),
            Err(SettingsError::TypeMismatch { .. })
        ));
        assert_eq!(value_of(&parse("a = 1\na = 2\n").unwrap(), "a"), SettingValue::Int(2));
    }
}
