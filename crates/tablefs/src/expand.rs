// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Wildcard path expansion across table files.
//!
//! A pattern such as `data/run*.tbl/evt/ch*` splits into a file part
//! (`data/run*.tbl`, resolved against the filesystem) and in-file segments
//! (`evt`, `ch*`, resolved against each file's manifest). The file part ends
//! at the first segment carrying the `.tbl` extension, or after the first
//! segment when none does.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use diagnostics::*;
use wax::Glob;

use crate::error::*;
use crate::file::{ChildKind, TableFile};
use crate::format::EXTENSION;
use crate::glob::{SegmentPattern, WILDCARD};

/// One resolved location inside one file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConcretePath {
    pub file: PathBuf,
    pub location: String,
    pub kind: ChildKind,
}

impl fmt::Display for ConcretePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file.display(), self.location)
    }
}

/// A parsed path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    file: String,
    segments: Vec<SegmentPattern>,
}

/// Index of the last segment belonging to the file part
fn file_part_end(segments: &[&str]) -> usize {
    segments
        .iter()
        .position(|s| s.ends_with(EXTENSION))
        .unwrap_or(0)
}

/// Split `file.tbl/location` into its file and (possibly empty) location.
/// `None` when no segment names a table file.
#[must_use]
pub fn split_table_path(input: &str) -> Option<(PathBuf, String)> {
    let segments: Vec<&str> = input.split('/').collect();
    let end = segments.iter().position(|s| s.ends_with(EXTENSION))?;
    let location = segments[end + 1..]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    Some((PathBuf::from(segments[..=end].join("/")), location))
}

/// Wax expression for a file part. `*` is the only wildcard; every other
/// wax metacharacter is matched literally, and runs of `*` collapse to one.
fn glob_expression(file: &str) -> String {
    let mut expression = String::with_capacity(file.len());
    for (i, literal) in file.split(WILDCARD).enumerate() {
        if i > 0 && !expression.ends_with(WILDCARD) {
            expression.push(WILDCARD);
        }
        expression.push_str(&wax::escape(literal));
    }
    expression
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        if !pattern.contains('/') || pattern.ends_with('/') {
            return Err(Error::NoTableName(pattern.to_string()));
        }

        let parts: Vec<&str> = pattern.split('/').collect();
        let end = file_part_end(&parts);
        let file = parts[..=end].join("/");

        let segments = parts[end + 1..]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| SegmentPattern::parse(s))
            .collect::<Result<Vec<_>>>()?;
        if file.is_empty() || segments.is_empty() {
            return Err(Error::NoTableName(pattern.to_string()));
        }

        Ok(Self {
            raw: pattern.to_string(),
            file,
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The filesystem part of the pattern
    #[must_use]
    pub fn file_part(&self) -> &str {
        &self.file
    }

    #[must_use]
    pub fn segments(&self) -> &[SegmentPattern] {
        &self.segments
    }

    #[must_use]
    pub fn has_file_wildcard(&self) -> bool {
        self.file.contains(WILDCARD)
    }

    /// Files named by the file part, in walk order
    pub fn resolve_files(&self) -> Result<Vec<PathBuf>> {
        if !self.has_file_wildcard() {
            let path = PathBuf::from(&self.file);
            if !path.is_file() {
                return Err(Error::path_resolution(&self.raw, "no such file"));
            }
            return Ok(vec![path]);
        }

        let expression = glob_expression(&self.file);
        let glob = Glob::new(&expression).map_err(|e| Error::Glob(e.to_string()))?;
        let (prefix, glob) = glob.partition();
        let relative = prefix.as_os_str().is_empty();
        let root = if relative {
            PathBuf::from(".")
        } else {
            prefix
        };
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in glob.walk(&root) {
            let entry = entry.map_err(|e| Error::Glob(e.to_string()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let path = if relative {
                path.strip_prefix(&root).unwrap_or(path).to_path_buf()
            } else {
                path.to_path_buf()
            };
            files.push(path);
        }
        debug!(
            "File pattern {pattern} matched {count} files",
            pattern: self.file.clone(),
            count: files.len()
        );
        Ok(files)
    }

    /// Resolve the in-file segments against one open file
    #[must_use]
    pub fn expand_file(&self, file: &TableFile) -> Vec<ConcretePath> {
        let mut frontier = vec![String::new()];
        for segment in &self.segments {
            let mut next = Vec::new();
            for location in &frontier {
                for child in file.children(location) {
                    if segment.matches(&child.name) {
                        next.push(join(location, &child.name));
                    }
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        frontier
            .into_iter()
            .filter_map(|location| {
                let kind = file.kind_of(&location)?;
                Some(ConcretePath {
                    file: file.path().to_path_buf(),
                    location,
                    kind,
                })
            })
            .collect()
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Expand a pattern, handing each concrete path to `visit` as soon as its
/// file has been scanned. Only one file is open at a time.
pub fn expand_each<F>(pattern: &str, mut visit: F) -> Result<()>
where
    F: FnMut(ConcretePath) -> Result<()>,
{
    let pattern = PathPattern::parse(pattern)?;
    let mut seen: HashSet<(PathBuf, String)> = HashSet::new();

    for path in pattern.resolve_files()? {
        let file = TableFile::open(&path)?;
        let found = pattern.expand_file(&file);
        debug!(
            "{file} contributes {count} locations",
            file: path.display().to_string(),
            count: found.len()
        );
        drop(file);

        for concrete in found {
            if seen.insert((concrete.file.clone(), concrete.location.clone())) {
                visit(concrete)?;
            }
        }
    }
    Ok(())
}

/// Expand a pattern into the ordered, deduplicated list of concrete paths
pub fn expand(pattern: &str) -> Result<Vec<ConcretePath>> {
    let mut paths = Vec::new();
    expand_each(pattern, |p| {
        paths.push(p);
        Ok(())
    })?;
    info!("Expanded {pattern} to {count} locations", pattern, count: paths.len());
    Ok(paths)
}

/// Convenience for callers that already hold a path
pub fn expand_path<P: AsRef<Path>>(file: P, in_file: &str) -> Result<Vec<ConcretePath>> {
    let joined = format!("{}/{}", file.as_ref().display(), in_file);
    expand(&joined)
}
