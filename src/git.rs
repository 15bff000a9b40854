//! Git repository operations.

use std::path::{Path, PathBuf};

use crate::command::{CommandRunner, ExecutionResult, Invocation};

/// Whether the backup branch had to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backup {
    Created,
    /// A branch with that name was left by an earlier run
    AlreadyExisted,
}

/// A git repository handle that provides the operations the scrub needs.
pub struct Git<'r> {
    root: PathBuf,
    runner: &'r dyn CommandRunner,
}

impl<'r> Git<'r> {
    /// Use `root` as the repository without checking it.
    pub fn at(root: impl Into<PathBuf>, runner: &'r dyn CommandRunner) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    /// Find the git repository root containing the directory `start`.
    pub fn discover(start: &Path, runner: &'r dyn CommandRunner) -> Result<Self, Error> {
        let start_dir = if start.as_os_str().is_empty() {
            Path::new(".")
        } else {
            start
        };

        let result = runner.run(
            &Invocation::new("git").args(["rev-parse", "--show-toplevel"]),
            start_dir,
        );
        if !result.succeeded {
            return Err(Error::NotARepo {
                path: start_dir.display().to_string(),
                stderr: result.stderr.trim().to_string(),
            });
        }

        let root = result.stdout.trim();
        if root.is_empty() {
            return Err(Error::NotARepo {
                path: start_dir.display().to_string(),
                stderr: String::new(),
            });
        }
        Ok(Self::at(root, runner))
    }

    /// Get the repository root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create `name` at HEAD, tolerating a branch left over from a previous run.
    ///
    /// Any other failure comes back as the raw result so the caller can
    /// report git's message.
    pub fn create_backup(&self, name: &str) -> Result<Backup, ExecutionResult> {
        let result = self.run(&["branch", name]);
        if result.succeeded {
            Ok(Backup::Created)
        } else if result.stderr.contains("already exists") {
            Ok(Backup::AlreadyExisted)
        } else {
            Err(result)
        }
    }

    /// Hard-reset the current branch and working tree to `target`.
    pub fn reset_hard(&self, target: &str) -> ExecutionResult {
        self.run(&["reset", "--hard", target])
    }

    /// Name of the checked-out branch, or `None` on a detached HEAD.
    pub fn current_branch(&self) -> Option<String> {
        let result = self.run(&["rev-parse", "--abbrev-ref", "HEAD"]);
        let name = result.stdout.trim();
        (result.succeeded && !name.is_empty() && name != "HEAD").then(|| name.to_string())
    }

    /// Run an arbitrary invocation from the repository root.
    pub fn run_in_root(&self, invocation: &Invocation) -> ExecutionResult {
        self.runner.run(invocation, &self.root)
    }

    fn run(&self, args: &[&str]) -> ExecutionResult {
        self.run_in_root(&Invocation::new("git").args(args.iter().copied()))
    }
}

/// Errors from git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a git repository (searched from '{path}'): {stderr}")]
    NotARepo { path: String, stderr: String },
}
