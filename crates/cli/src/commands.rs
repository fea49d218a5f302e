//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("boardkeep")
        .about("Snapshots, retention and self-healing for team board documents")
        .version(clap::crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Config file (default: boardkeep.toml)")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output mode")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Debug logging on stderr")
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only warnings and errors on stderr")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(build_run())
        .subcommand(build_restore())
        .subcommand(build_status())
        .subcommand(build_prune())
        .subcommand(build_list())
        .subcommand(build_init())
}

fn build_run() -> Command {
    Command::new("run").about("Run one backup pass over every configured team")
}

fn build_restore() -> Command {
    Command::new("restore")
        .about("Restore a team's board directory from a snapshot")
        .arg(Arg::new("team").required(true).help("Team id"))
        .arg(
            Arg::new("snapshot")
                .long("snapshot")
                .short('s')
                .help("Snapshot file name (default: newest valid snapshot)"),
        )
        .arg(
            Arg::new("yes")
                .long("yes")
                .short('y')
                .help("Do not ask for confirmation")
                .action(ArgAction::SetTrue),
        )
}

fn build_status() -> Command {
    Command::new("status").about("Show the status recorded by the last pass")
}

fn build_prune() -> Command {
    Command::new("prune")
        .about("Apply the retention policy without taking snapshots")
        .arg(
            Arg::new("team")
                .long("team")
                .short('t')
                .help("Only this team (default: all teams)"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Report what would be deleted, delete nothing")
                .action(ArgAction::SetTrue),
        )
}

fn build_list() -> Command {
    Command::new("list")
        .about("List a team's snapshots, oldest first")
        .arg(Arg::new("team").required(true).help("Team id"))
}

fn build_init() -> Command {
    Command::new("init").about("Write a default config file if none exists")
}
