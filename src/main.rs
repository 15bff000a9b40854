use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use secret_scrub::{ArtifactFormat, Config, Git, RuleSet, Scrubber, SystemRunner};

#[derive(Parser)]
#[command(name = "secret-scrub")]
#[command(about = "Remove leaked API keys from git history using git-filter-repo")]
struct Cli {
    /// Directory inside the repository to scrub
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// TOML config file (default: .secret-scrub.toml in the repository root)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Leave out the catch-all rule for 32+ character alphanumeric runs
    #[arg(long)]
    no_generic_rule: bool,

    /// Layout of the replacement file handed to git-filter-repo
    #[arg(long, value_enum)]
    format: Option<ArtifactFormat>,

    /// Print the generated replacement file and exit
    #[arg(long, conflicts_with = "check")]
    print_rules: bool,

    /// Show what the rules would replace in these working-tree files and exit
    #[arg(long, value_name = "FILE", num_args = 1..)]
    check: Vec<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let runner = SystemRunner;

    // Previews work outside a repository too; only the scrub itself needs one.
    let offline = cli.print_rules || !cli.check.is_empty();
    let git = match Git::discover(&cli.repo, &runner) {
        Ok(git) => git,
        Err(_) if offline => Git::at(&cli.repo, &runner),
        Err(e) => return Err(e.into()),
    };

    let mut config =
        Config::load(cli.config.as_deref(), git.root()).context("failed to load configuration")?;
    if cli.no_generic_rule {
        config.generic_rule = false;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    let rules = config.rule_set()?;

    if cli.print_rules {
        print!("{}", secret_scrub::artifact::render(&rules, config.format));
        return Ok(());
    }
    if !cli.check.is_empty() {
        return check(&rules, &cli.check);
    }

    println!("🔍 Removing secrets from Git history...");
    let scrubber = Scrubber::new(&git, rules, config.scrub_options(git.root()));
    match scrubber.run() {
        Ok(report) => {
            println!("📝 Next steps:");
            for (i, step) in report.next_steps().iter().enumerate() {
                println!("   {}. {step}", i + 1);
            }
            Ok(())
        }
        Err(e) => {
            if let secret_scrub::Error::Rewrite { restored: false, .. } = &e {
                eprintln!(
                    "⚠ Could not reset to '{}'; restore manually with: git reset --hard {}",
                    config.backup_branch, config.backup_branch
                );
            }
            Err(e.into())
        }
    }
}

/// Report per-file, per-rule match counts without changing anything.
fn check(rules: &RuleSet, files: &[PathBuf]) -> anyhow::Result<()> {
    for file in files {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read '{}'", file.display()))?;
        let name = file.to_string_lossy();

        if !rules.applies_to(&name) {
            println!("{}: skipped (extension not scrubbed)", file.display());
            continue;
        }

        let matches = rules.matches(&name, &content);
        if matches.is_empty() {
            println!("{}: clean", file.display());
            continue;
        }
        println!("{}:", file.display());
        for (entry, count) in matches {
            println!("   {count} × {} -> {}", entry.pattern, entry.replacement);
        }
    }
    Ok(())
}
