//! secret-scrub: strip leaked API keys out of git history.
//!
//! The heavy lifting is done by `git filter-repo`; this crate backs up the
//! current branch, generates the replacement rules the rewriter runs against
//! every blob, invokes it, and rolls back if it fails.
//!
//! # Architecture
//!
//! - **Rules**: Ordered secret patterns and the per-blob replacement logic
//! - **Artifact**: Render rules into the file handed to the rewriter
//! - **Command**: Run external programs without ever raising
//! - **Git**: Backup branch, reset, repository discovery
//! - **Scrub**: The backup / write / rewrite / cleanup workflow
//! - **Config**: Optional TOML overrides

pub mod artifact;
pub mod command;
pub mod config;
pub mod git;
pub mod rules;
mod scrub;

pub use artifact::ArtifactFormat;
pub use command::{CommandRunner, ExecutionResult, Invocation, SystemRunner};
pub use config::{Config, DEFAULT_CONFIG_FILE};
pub use git::{Backup, Git};
pub use rules::{RuleEntry, RuleSet};
pub use scrub::{Error, Report, ScrubOptions, Scrubber, Stage};
