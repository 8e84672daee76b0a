// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use crate::error::*;

/// Characters separating stage names besides whitespace
const SEPARATORS: [char; 3] = [',', '+', ':'];

/// Ordered list of stage names, e.g. `copy,scale` or `"copy scale"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperSpec {
    stages: Vec<String>,
}

impl MapperSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let mut stages = Vec::new();
        for piece in spec.split(SEPARATORS) {
            let names: Vec<&str> = piece.split_whitespace().collect();
            if names.is_empty() {
                return Err(Error::invalid_spec(spec, "empty stage name"));
            }
            for name in names {
                if !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                {
                    return Err(Error::invalid_spec(
                        spec,
                        format!("'{name}' is not a valid stage name"),
                    ));
                }
                stages.push(name.to_string());
            }
        }
        Ok(Self { stages })
    }

    #[must_use]
    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl FromStr for MapperSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MapperSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stages.join(","))
    }
}
