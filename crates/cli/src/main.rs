//! boardkeep CLI: backup passes, restores and retention for team boards.
//!
//! `boardkeep [flags] COMMAND`, one command per invocation. Exit status is
//! 0 on success, 1 on error and 2 when a pass found a team it could not
//! recover.

mod commands;
mod format;

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use boardkeep_core::{BoardkeepConfig, CONFIG_FILE_NAME};
use boardkeep_engine::BackupEngine;
use chrono::Utc;
use clap::ArgMatches;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::build_cli;
use format::{
    format_error, format_pass, format_prune, format_restore, format_snapshots, format_status,
    OutputMode,
};

fn main() {
    let matches = build_cli().get_matches();
    init_logging(&matches);

    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let exit_code = match run(&matches, mode) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format_error(&e, mode));
            1
        }
    };
    process::exit(exit_code);
}

fn init_logging(matches: &ArgMatches) {
    let default_level = if matches.get_flag("verbose") {
        "debug"
    } else if matches.get_flag("quiet") {
        "warn"
    } else {
        "info"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn config_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

fn open_engine(path: &Path) -> anyhow::Result<BackupEngine> {
    debug!(target: "boardkeep::cli", config = ?path, "Loading configuration");
    let config = BoardkeepConfig::from_file(path)
        .with_context(|| format!("loading config {}", path.display()))?;
    BackupEngine::new(config).context("invalid configuration")
}

fn run(matches: &ArgMatches, mode: OutputMode) -> anyhow::Result<i32> {
    let path = config_path(matches);

    match matches.subcommand() {
        Some(("init", _)) => {
            let created = BoardkeepConfig::write_default_if_missing(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            if created {
                println!("wrote default config to {}", path.display());
            } else {
                println!("{} already exists, left unchanged", path.display());
            }
            Ok(0)
        }
        Some(("run", _)) => {
            let engine = open_engine(&path)?;
            let report = engine.run_pass(Utc::now());
            println!("{}", format_pass(&report, mode));
            Ok(report.exit_code())
        }
        Some(("restore", sub)) => {
            let team = sub
                .get_one::<String>("team")
                .context("missing team argument")?;
            let snapshot = sub.get_one::<String>("snapshot").map(String::as_str);
            let engine = open_engine(&path)?;
            // Fail fast on unknown teams before prompting
            engine.config().team_paths(team)?;

            if !sub.get_flag("yes") && !confirm_restore(team, snapshot)? {
                eprintln!("restore cancelled");
                return Ok(1);
            }
            let report = engine
                .restore_team(team, snapshot, Utc::now())
                .with_context(|| format!("restoring team {}", team))?;
            println!("{}", format_restore(&report, mode));
            Ok(0)
        }
        Some(("status", _)) => {
            let engine = open_engine(&path)?;
            let status = engine.status().context("reading status")?;
            println!("{}", format_status(&status, mode));
            Ok(status.overall_status.exit_code())
        }
        Some(("prune", sub)) => {
            let engine = open_engine(&path)?;
            let team = sub.get_one::<String>("team").map(String::as_str);
            let results = engine.prune(team, Utc::now(), sub.get_flag("dry-run"))?;
            println!("{}", format_prune(&results, mode));
            let failed = results
                .iter()
                .any(|r| r.result.as_ref().map_or(true, |p| !p.failed.is_empty()));
            Ok(if failed { 1 } else { 0 })
        }
        Some(("list", sub)) => {
            let team = sub
                .get_one::<String>("team")
                .context("missing team argument")?;
            let engine = open_engine(&path)?;
            let entries = engine.list_snapshots(team)?;
            println!("{}", format_snapshots(&entries, mode));
            Ok(0)
        }
        Some((other, _)) => bail!("unknown command '{}'", other),
        None => bail!("no command given"),
    }
}

/// Ask on the terminal before overwriting a live board
fn confirm_restore(team: &str, snapshot: Option<&str>) -> anyhow::Result<bool> {
    if !io::stdin().is_terminal() {
        bail!("refusing to restore without --yes when stdin is not a terminal");
    }
    let source = snapshot.unwrap_or("the newest valid snapshot");
    eprint!(
        "Restore team '{}' from {}? Live files will be overwritten. [y/N] ",
        team, source
    );
    io::stderr().flush().context("flushing prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
