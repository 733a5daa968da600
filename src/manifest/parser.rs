//! packages.yml / dependencies.yml parsing and version rewriting
//!
//! Both formats share the `packages:` list, so each adapter is a thin wrapper
//! over the same entry parser and the same line-based version rewriter.

use crate::domain::{DeclaredDependency, ManifestKind, PackageId, PackageSource};
use crate::error::ManifestError;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::{debug, warn};

/// Trait for parsing and editing manifest files
pub trait ManifestParser {
    /// Returns the format this parser handles
    fn kind(&self) -> ManifestKind;

    /// Parse the declared dependencies, in declaration order
    fn parse(&self, path: &Path, content: &str) -> Result<Vec<DeclaredDependency>, ManifestError>;

    /// Replace the declared version of a hub package in the manifest text
    fn update_version(
        &self,
        path: &Path,
        content: &str,
        package: &PackageId,
        new_version: &str,
    ) -> Result<VersionEdit, ManifestError> {
        rewrite_version(path, content, package, new_version)
    }
}

/// Legacy packages.yml
pub struct PackagesYmlParser;

/// Current dependencies.yml
pub struct DependenciesYmlParser;

impl ManifestParser for PackagesYmlParser {
    fn kind(&self) -> ManifestKind {
        ManifestKind::Packages
    }

    fn parse(&self, path: &Path, content: &str) -> Result<Vec<DeclaredDependency>, ManifestError> {
        let doc = load_yaml(path, content)?;
        if doc.get("projects").is_some() {
            warn!(path = %path.display(), "'projects' is only supported in dependencies.yml, ignoring");
        }
        parse_packages_list(path, &doc)
    }
}

impl ManifestParser for DependenciesYmlParser {
    fn kind(&self) -> ManifestKind {
        ManifestKind::Dependencies
    }

    fn parse(&self, path: &Path, content: &str) -> Result<Vec<DeclaredDependency>, ManifestError> {
        let doc = load_yaml(path, content)?;
        if let Some(projects) = doc.get("projects").and_then(Value::as_sequence) {
            debug!(count = projects.len(), "skipping project dependencies");
        }
        parse_packages_list(path, &doc)
    }
}

/// Get the parser for a manifest format
pub fn get_parser(kind: ManifestKind) -> Box<dyn ManifestParser> {
    match kind {
        ManifestKind::Packages => Box::new(PackagesYmlParser),
        ManifestKind::Dependencies => Box::new(DependenciesYmlParser),
    }
}

/// Reads a `version:`-style value: a string, a number or a list of either
pub fn version_strings(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Number(n) => Some(vec![n.to_string()]),
        Value::Sequence(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn load_yaml(path: &Path, content: &str) -> Result<Value, ManifestError> {
    serde_yaml::from_str(content).map_err(|e| ManifestError::yaml_parse_error(path, e.to_string()))
}

fn parse_packages_list(path: &Path, doc: &Value) -> Result<Vec<DeclaredDependency>, ManifestError> {
    let packages = match doc.get("packages") {
        Some(Value::Sequence(items)) => items.as_slice(),
        Some(Value::Null) => &[],
        _ => {
            return Err(ManifestError::MissingPackagesKey {
                path: path.to_path_buf(),
            })
        }
    };

    packages
        .iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(path, index, entry))
        .collect()
}

fn parse_entry(path: &Path, index: usize, entry: &Value) -> Result<DeclaredDependency, ManifestError> {
    let map = entry
        .as_mapping()
        .ok_or_else(|| ManifestError::invalid_entry(path, index, "entry must be a mapping"))?;

    let string_field = |key: &str| -> Result<Option<String>, ManifestError> {
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(_) => Err(ManifestError::invalid_entry(
                path,
                index,
                format!("'{}' must be a string", key),
            )),
        }
    };

    let dependency = if let Some(id) = string_field("package")? {
        let raw_version = map
            .get("version")
            .and_then(version_strings)
            .unwrap_or_default();
        DeclaredDependency::hub(id, raw_version)
    } else if let Some(local) = string_field("local")? {
        DeclaredDependency::private(PackageSource::Local, local)
    } else if let Some(git) = string_field("git")? {
        let reference = match string_field("subdirectory")? {
            Some(sub) => format!("{}/{}", git.trim_end_matches('/'), sub.trim_matches('/')),
            None => git,
        };
        DeclaredDependency::private(PackageSource::Git, reference)
    } else if let Some(tarball) = string_field("tarball")? {
        DeclaredDependency::private(PackageSource::Tarball, tarball)
    } else {
        return Err(ManifestError::invalid_entry(
            path,
            index,
            "entry must declare one of 'package', 'local', 'git' or 'tarball'",
        ));
    };

    let dependency = match string_field("name")? {
        Some(name) if !dependency.is_public_package() => dependency.with_name(name),
        _ => dependency,
    };
    Ok(dependency.with_prerelease(opts_in_prerelease(map)))
}

fn opts_in_prerelease(map: &Mapping) -> bool {
    match map.get("install-prerelease") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// A single-entry version rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionEdit {
    /// Full manifest text after the edit
    pub content: String,
    /// Lines replaced by the edit, without line endings
    pub removed: Vec<String>,
    /// Line written by the edit, without line ending
    pub added: String,
}

impl VersionEdit {
    /// Returns true if the edit left the text as it was
    pub fn is_noop(&self) -> bool {
        self.removed.len() == 1 && self.removed[0] == self.added
    }
}

/// Line span of one `packages:` list item
struct ItemSpan {
    /// Index of the line holding the matching `package:` key
    package_line: usize,
    /// Index one past the item's last line
    end: usize,
    /// Column of the item's keys
    key_indent: usize,
    /// Line indices holding keys of this item
    key_lines: Vec<usize>,
}

fn rewrite_version(
    path: &Path,
    content: &str,
    package: &PackageId,
    new_version: &str,
) -> Result<VersionEdit, ManifestError> {
    let mut lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
    let item = find_package_item(&lines, package.as_str())
        .ok_or_else(|| ManifestError::entry_not_found(path, package.as_str()))?;
    let value = format!("\"{}\"", new_version);

    let version_line = item
        .key_lines
        .iter()
        .copied()
        .find(|&i| key_of(&lines[i], item.key_indent) == Some("version"));

    let (removed, added) = match version_line {
        Some(i) => {
            let (head, rest) = split_at_value(&lines[i], item.key_indent);
            let comment = comment_of(rest);
            let added = match comment {
                Some(c) => format!("{} {} {}", head, value, c),
                None => format!("{} {}", head, value),
            };

            // A block list continues on the following, deeper or `- ` lines
            let mut block_end = i + 1;
            if strip_comment(rest).trim().is_empty() {
                while block_end < item.end
                    && is_block_continuation(&lines[block_end], item.key_indent)
                {
                    block_end += 1;
                }
                while block_end > i + 1 && lines[block_end - 1].trim().is_empty() {
                    block_end -= 1;
                }
            }

            let eol = line_ending(&lines[block_end - 1]).to_string();
            let removed: Vec<String> = lines[i..block_end]
                .iter()
                .map(|l| l.trim_end_matches(['\r', '\n']).to_string())
                .collect();
            lines.splice(i..block_end, std::iter::once(format!("{}{}", added, eol)));
            (removed, added)
        }
        None => {
            let at = item.package_line;
            let added = format!("{}version: {}", " ".repeat(item.key_indent), value);
            let package_line = lines[at].trim_end_matches(['\r', '\n']).to_string();
            match line_ending(&lines[at]).to_string() {
                eol if eol.is_empty() => {
                    lines[at].push('\n');
                    lines.insert(at + 1, added.clone());
                }
                eol => lines.insert(at + 1, format!("{}{}", added, eol)),
            }
            let joined = format!("{}\n{}", package_line, added);
            (vec![package_line], joined)
        }
    };

    Ok(VersionEdit {
        content: lines.concat(),
        removed,
        added,
    })
}

/// Locates the `packages:` list item whose `package:` value is `package`
fn find_package_item(lines: &[String], package: &str) -> Option<ItemSpan> {
    let start = lines
        .iter()
        .position(|l| indent_of(l) == 0 && key_of(l, 0) == Some("packages"))?
        + 1;
    let section_end = lines[start..]
        .iter()
        .position(|l| {
            let t = l.trim();
            indent_of(l) == 0 && !t.is_empty() && !t.starts_with('#') && !t.starts_with('-')
        })
        .map_or(lines.len(), |p| start + p);

    let dash_indent = lines[start..section_end]
        .iter()
        .find(|l| is_item_start(l))
        .map(|l| indent_of(l))?;

    let item_starts: Vec<usize> = (start..section_end)
        .filter(|&i| is_item_start(&lines[i]) && indent_of(&lines[i]) == dash_indent)
        .collect();

    for (n, &item_start) in item_starts.iter().enumerate() {
        let end = item_starts.get(n + 1).copied().unwrap_or(section_end);
        let first = &lines[item_start];
        let after_dash = &first[dash_indent + 1..];
        let key_indent = dash_indent + 1 + (after_dash.len() - after_dash.trim_start().len());

        let key_lines: Vec<usize> = std::iter::once(item_start)
            .chain((item_start + 1..end).filter(|&i| {
                indent_of(&lines[i]) == key_indent && !lines[i].trim_start().starts_with(['-', '#'])
            }))
            .collect();

        let package_line = key_lines.iter().copied().find(|&i| {
            key_of(&lines[i], key_indent) == Some("package")
                && unquote(strip_comment(split_at_value(&lines[i], key_indent).1)) == package
        });

        if let Some(package_line) = package_line {
            return Some(ItemSpan {
                package_line,
                end,
                key_indent,
                key_lines,
            });
        }
    }
    None
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_item_start(line: &str) -> bool {
    let t = line.trim_start();
    t == "-" || t.starts_with("- ") || t.starts_with("-\n") || t.starts_with("-\r")
}

fn is_block_continuation(line: &str, key_indent: usize) -> bool {
    let t = line.trim();
    t.is_empty() || indent_of(line) > key_indent || (indent_of(line) == key_indent && t.starts_with('-'))
}

/// The key at column `key_indent`, if the line has one there
fn key_of(line: &str, key_indent: usize) -> Option<&str> {
    let body = line.get(key_indent..)?;
    let (key, _) = body.split_once(':')?;
    let key = key.trim_end();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then_some(key)
}

/// Splits a key line into `"<indent>key:"` and the raw value after it
fn split_at_value(line: &str, key_indent: usize) -> (&str, &str) {
    let body = line.trim_end_matches(['\r', '\n']);
    match body[key_indent..].find(':') {
        Some(p) => body.split_at(key_indent + p + 1),
        None => (body, ""),
    }
}

fn strip_comment(value: &str) -> &str {
    match comment_start(value) {
        Some(p) => &value[..p],
        None => value,
    }
}

fn comment_of(value: &str) -> Option<&str> {
    comment_start(value).map(|p| value[p..].trim_end())
}

/// Byte offset of a `#` comment outside quotes
fn comment_start(value: &str) -> Option<usize> {
    let mut quote = None;
    let mut prev_blank = true;
    for (i, c) in value.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '#') if prev_blank => return Some(i),
            _ => {}
        }
        prev_blank = c.is_whitespace();
    }
    None
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    v.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(v)
}

fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}
