//! The scrub workflow: back up, write rules, rewrite history, clean up.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::artifact::{self, ArtifactFormat};
use crate::command::Invocation;
use crate::git::{Backup, Git};
use crate::rules::RuleSet;

/// Where a scrub run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    BackedUp,
    RuleWritten,
    Cleanup,
    Succeeded,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Start => "start",
            Stage::BackedUp => "backed-up",
            Stage::RuleWritten => "rules-written",
            Stage::Cleanup => "cleanup",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        })
    }
}

/// Everything a run needs besides the repository and rules.
#[derive(Debug, Clone)]
pub struct ScrubOptions {
    pub backup_branch: String,

    /// Absolute path of the replacement artifact
    pub artifact_path: PathBuf,

    /// Program and leading arguments of the rewriter, e.g. `["git", "filter-repo"]`
    pub filter_command: Vec<String>,

    pub format: ArtifactFormat,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub backup: Backup,
    pub backup_branch: String,

    /// Branch that now needs a force push, if HEAD is on one
    pub branch: Option<String>,

    /// Whether cleanup deleted the artifact. False when it was already gone
    /// or could not be removed; the latter is logged as a warning.
    pub artifact_removed: bool,
}

/// Drives one scrub of a repository's history.
pub struct Scrubber<'g> {
    git: &'g Git<'g>,
    rules: RuleSet,
    options: ScrubOptions,
}

impl<'g> Scrubber<'g> {
    pub fn new(git: &'g Git<'g>, rules: RuleSet, options: ScrubOptions) -> Self {
        Self {
            git,
            rules,
            options,
        }
    }

    /// The command that applies the artifact to every revision.
    pub fn rewrite_invocation(&self) -> Result<Invocation, Error> {
        let invocation =
            Invocation::from_argv(&self.options.filter_command).ok_or(Error::NoFilterCommand)?;
        Ok(invocation
            .arg("--replace-text")
            .arg(self.options.artifact_path.display().to_string())
            .arg("--force"))
    }

    /// Run the whole workflow.
    ///
    /// On a rewriter failure the repository is reset to the backup branch
    /// and the artifact is left in place for inspection.
    pub fn run(&self) -> Result<Report, Error> {
        let rewrite = self.rewrite_invocation()?;
        let backup_branch = &self.options.backup_branch;
        let artifact_path = &self.options.artifact_path;

        // Start
        tracing::info!(stage = %Stage::Start, root = %self.git.root().display(), "scrubbing history");
        println!("📦 Creating backup branch...");
        let backup = self
            .git
            .create_backup(backup_branch)
            .map_err(|result| Error::Backup {
                branch: backup_branch.clone(),
                stderr: result.stderr.trim().to_string(),
            })?;
        if backup == Backup::AlreadyExisted {
            println!("   Backup branch '{backup_branch}' already exists, keeping it");
        }

        // BackedUp
        tracing::info!(stage = %Stage::BackedUp, ?backup);
        if self.options.format == ArtifactFormat::Expressions {
            tracing::warn!("expressions format rewrites every file, ignoring the extension list");
            println!(
                "⚠ Expressions format cannot filter by extension: every file in history will be scrubbed"
            );
        }
        artifact::write(artifact_path, &self.rules, self.options.format)?;

        // RuleWritten
        tracing::info!(stage = %Stage::RuleWritten, artifact = %artifact_path.display());
        println!("🔧 Running {} to remove secrets...", rewrite.program_line());
        let result = self.git.run_in_root(&rewrite);
        if !result.succeeded {
            let stderr = result.stderr.trim().to_string();
            println!("🔄 {} failed, restoring from backup...", rewrite.program_line());

            let reset = self.git.reset_hard(backup_branch);
            if reset.succeeded {
                tracing::info!(stage = %Stage::Failed, "restored from backup");
            } else {
                tracing::warn!(
                    stage = %Stage::Failed,
                    stderr = %reset.stderr.trim(),
                    "reset to backup failed"
                );
            }
            return Err(Error::Rewrite {
                stderr,
                restored: reset.succeeded,
            });
        }
        println!("✅ Successfully removed secrets from Git history!");

        // Cleanup
        tracing::info!(stage = %Stage::Cleanup);
        let artifact_removed = match artifact::remove(artifact_path) {
            Ok(removed) => removed,
            Err(e) => {
                // History is already rewritten; a leftover file is not a failure.
                tracing::warn!(error = %e, "could not remove artifact");
                false
            }
        };
        if artifact_removed {
            println!("🧹 Cleaned up temporary files");
        }

        tracing::info!(stage = %Stage::Succeeded);
        Ok(Report {
            backup,
            backup_branch: backup_branch.clone(),
            branch: self.git.current_branch(),
            artifact_removed,
        })
    }
}

impl Report {
    /// Follow-up guidance printed after a successful run.
    pub fn next_steps(&self) -> Vec<String> {
        let branch = self.branch.as_deref().unwrap_or("main");
        vec![
            format!("Force push to update remote: git push --force-with-lease origin {branch}"),
            "Update any other remotes that need the cleaned history".to_string(),
            format!(
                "Delete the backup once satisfied: git branch -D {}",
                self.backup_branch
            ),
        ]
    }
}

/// Errors that end a scrub run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no history rewriting command configured")]
    NoFilterCommand,

    #[error("failed to create backup branch '{branch}': {stderr}")]
    Backup { branch: String, stderr: String },

    #[error(transparent)]
    WriteArtifact(#[from] artifact::Error),

    #[error("history rewrite failed: {stderr}")]
    Rewrite {
        stderr: String,
        /// Whether `git reset --hard` back to the backup succeeded
        restored: bool,
    },
}

impl Error {
    /// The last stage reached before the failure.
    pub fn stage(&self) -> Stage {
        match self {
            Error::NoFilterCommand | Error::Backup { .. } => Stage::Start,
            Error::WriteArtifact(_) => Stage::BackedUp,
            Error::Rewrite { .. } => Stage::RuleWritten,
        }
    }
}
