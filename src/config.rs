//! Optional TOML configuration.
//!
//! Every key has a default, so an absent or empty file reproduces the
//! built-in behaviour.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactFormat;
use crate::rules::{self, DEFAULT_EXTENSIONS, RuleEntry, RuleSet};
use crate::scrub::ScrubOptions;

/// File looked up in the repository root when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = ".secret-scrub.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Branch created at HEAD before rewriting, and reset to on failure
    pub backup_branch: String,

    /// Where the replacement artifact is written, relative to the repo root
    pub artifact: PathBuf,

    /// Program and leading arguments of the history rewriter
    pub filter_command: Vec<String>,

    /// Filename suffixes whose blobs are scrubbed
    pub extensions: Vec<String>,

    /// Append the broad `[a-zA-Z0-9]{32,}` rule after all others
    pub generic_rule: bool,

    pub format: ArtifactFormat,

    /// Replaces the built-in vendor rules when non-empty
    #[serde(rename = "rule", skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backup_branch: "backup-before-secret-removal".to_string(),
            artifact: PathBuf::from("secret_replacement.py"),
            filter_command: vec!["git".to_string(), "filter-repo".to_string()],
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            generic_rule: true,
            format: ArtifactFormat::default(),
            rules: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a config from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load `explicit` if given, else `<repo_root>/.secret-scrub.toml` if it
    /// exists, else the defaults.
    pub fn load(explicit: Option<&Path>, repo_root: &Path) -> Result<Self, Error> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = repo_root.join(DEFAULT_CONFIG_FILE);
                if !candidate.exists() {
                    tracing::debug!("no config file, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        tracing::debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(&path).map_err(|source| Error::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| Error::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Compile the configured rules, in the order they will be applied.
    pub fn rule_set(&self) -> Result<RuleSet, rules::Error> {
        let mut entries = if self.rules.is_empty() {
            RuleEntry::builtin()
        } else {
            self.rules.clone()
        };
        if self.generic_rule {
            entries.push(RuleEntry::generic());
        }
        RuleSet::new(entries, self.extensions.clone())
    }

    /// Absolute artifact location for a repository rooted at `repo_root`.
    pub fn artifact_path(&self, repo_root: &Path) -> PathBuf {
        repo_root.join(&self.artifact)
    }

    pub fn scrub_options(&self, repo_root: &Path) -> ScrubOptions {
        ScrubOptions {
            backup_branch: self.backup_branch.clone(),
            artifact_path: self.artifact_path(repo_root),
            filter_command: self.filter_command.clone(),
            format: self.format,
        }
    }
}

/// Errors loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}'")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
