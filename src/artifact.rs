//! Rendering a [`RuleSet`] into the file handed to `git filter-repo`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::rules::RuleSet;

/// Layout of the replacement artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    /// Python snippet run per blob, with `filename` and `content` in scope.
    /// Honors the extension allow-list.
    #[default]
    Script,

    /// git-filter-repo's `regex:PATTERN==>TOKEN` lines. Cannot restrict by
    /// filename, so every blob is rewritten.
    Expressions,
}

/// Render `rules` in the given format.
pub fn render(rules: &RuleSet, format: ArtifactFormat) -> String {
    match format {
        ArtifactFormat::Script => render_script(rules),
        ArtifactFormat::Expressions => render_expressions(rules),
    }
}

fn render_script(rules: &RuleSet) -> String {
    let mut out = String::new();
    out.push_str("import re\n\n");
    out.push_str("# Patterns to match and replace secrets, applied in order\n");
    out.push_str("patterns = [\n");
    for entry in rules.entries() {
        let _ = writeln!(
            out,
            "    ({}, {}),",
            py_str(&entry.pattern),
            py_str(&entry.replacement)
        );
    }
    out.push_str("]\n\n");

    out.push_str("def replace_secrets(content):\n");
    out.push_str("    for pattern, replacement in patterns:\n");
    out.push_str("        content = re.sub(pattern, lambda _m, r=replacement: r, content)\n");
    out.push_str("    return content\n\n");

    // Trailing comma keeps a single suffix a tuple.
    let suffixes: String = rules
        .extensions()
        .iter()
        .map(|ext| format!("{}, ", py_str(ext)))
        .collect();
    let _ = writeln!(out, "if filename.endswith(({})):", suffixes.trim_end());
    out.push_str("    content = replace_secrets(content)\n");
    out
}

fn render_expressions(rules: &RuleSet) -> String {
    let mut out = String::new();
    for entry in rules.entries() {
        // filter-repo feeds the token to re.sub, so backslashes must be doubled.
        let token = entry.replacement.replace('\\', "\\\\");
        let _ = writeln!(out, "regex:{}==>{}", entry.pattern, token);
    }
    out
}

/// Quote `s` as a single-quoted Python string literal.
fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Write the rendered artifact to `path`, replacing whatever is there.
pub fn write(path: &Path, rules: &RuleSet, format: ArtifactFormat) -> Result<(), Error> {
    std::fs::write(path, render(rules, format)).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Delete the artifact if present. Returns whether there was one.
pub fn remove(path: &Path) -> Result<bool, Error> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(Error::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Errors writing or removing the artifact.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write replacement rules to '{}'", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove '{}'", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
