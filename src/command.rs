//! External command execution.
//!
//! Every external program (git, git-filter-repo) goes through a
//! [`CommandRunner`]. Runners never fail: launch errors and non-zero exits
//! alike come back as an [`ExecutionResult`] with `succeeded == false`.

use std::fmt;
use std::path::Path;
use std::process::Command;

/// A program plus its argument list.
///
/// Arguments are handed to the OS as-is, never through a shell, so paths
/// and branch names need no quoting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Build an invocation from a non-empty `[program, args...]` list.
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        let (program, rest) = argv.split_first()?;
        Some(Self::new(program.as_ref()).args(rest.iter().map(|s| s.as_ref())))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Program plus its leading subcommand, e.g. `git filter-repo`.
    pub fn program_line(&self) -> String {
        match self.args.first() {
            Some(sub) if !sub.starts_with('-') => format!("{} {sub}", self.program),
            _ => self.program.clone(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of running an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// True iff the process ran and exited with status zero
    pub succeeded: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Something that can run an [`Invocation`] in a directory.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation, cwd: &Path) -> ExecutionResult;
}

/// Runs commands as real child processes, blocking until they exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation, cwd: &Path) -> ExecutionResult {
        tracing::debug!(command = %invocation, cwd = %cwd.display(), "running");

        let output = match Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(cwd)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(command = %invocation, error = %e, "failed to launch");
                return ExecutionResult::failure(format!("{}: {e}", invocation.program));
            }
        };

        let result = ExecutionResult {
            succeeded: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        tracing::debug!(command = %invocation, status = %output.status, "finished");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new("git").args(["reset", "--hard", "backup"]);
        assert_eq!(inv.to_string(), "git reset --hard backup");
    }

    #[test]
    fn program_line_keeps_subcommand_only() {
        let inv = Invocation::new("git").args(["filter-repo", "--force"]);
        assert_eq!(inv.program_line(), "git filter-repo");
        let inv = Invocation::new("git-filter-repo").args(["--force"]);
        assert_eq!(inv.program_line(), "git-filter-repo");
    }

    #[test]
    fn from_argv_splits_program() {
        let inv = Invocation::from_argv(&["git", "filter-repo"]).unwrap();
        assert_eq!(inv.program(), "git");
        assert_eq!(inv.arguments(), ["filter-repo"]);

        let empty: [&str; 0] = [];
        assert!(Invocation::from_argv(&empty).is_none());
    }

    #[test]
    fn missing_program_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("secret-scrub-no-such-program-xyz");
        let result = SystemRunner.run(&inv, dir.path());
        assert!(!result.succeeded);
        assert!(result.stdout.is_empty());
        assert!(result.stderr.contains("secret-scrub-no-such-program-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_and_exit_status() {
        let dir = tempfile::tempdir().unwrap();

        let ok = SystemRunner.run(&Invocation::new("sh").args(["-c", "echo hello"]), dir.path());
        assert!(ok.succeeded);
        assert_eq!(ok.stdout.trim(), "hello");

        let failed = SystemRunner.run(
            &Invocation::new("sh").args(["-c", "echo oops >&2; exit 3"]),
            dir.path(),
        );
        assert!(!failed.succeeded);
        assert_eq!(failed.stderr.trim(), "oops");
    }
}
