//! Report → human/json string formatting.
//!
//! Two modes:
//! - **Human** (default): one line per team or snapshot
//! - **JSON** (`--json`): `serde_json::to_string_pretty`

use boardkeep_durability::{RestoreReport, SnapshotEntry};
use boardkeep_engine::{BackupStatus, PassReport, TeamPrune};
use serde_json::{json, Value};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format an error.
pub fn format_error(err: &anyhow::Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({ "error": format!("{:#}", err) })),
        OutputMode::Human => format!("(error) {:#}", err),
    }
}

/// Format the outcome of a backup pass.
pub fn format_pass(report: &PassReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({
            "started": report.started.to_rfc3339(),
            "overall_status": report.overall_status.as_str(),
            "total_snapshots": report.total_snapshots,
            "total_bytes": report.total_bytes,
            "teams": report.teams.iter().map(|t| json!({
                "team": t.team,
                "action": t.action.as_str(),
                "severity": t.severity.as_str(),
                "message": t.message,
                "snapshot": t.snapshot.as_ref().map(|s| s.path.display().to_string()),
                "pruned": t.pruned,
            })).collect::<Vec<_>>(),
        })),
        OutputMode::Human => {
            let mut lines: Vec<String> = report
                .teams
                .iter()
                .map(|t| format!("{:<16} {:<12} {}", t.team, t.action.as_str(), t.message))
                .collect();
            lines.push(format!(
                "overall: {} ({} snapshots, {})",
                report.overall_status,
                report.total_snapshots,
                human_bytes(report.total_bytes)
            ));
            lines.join("\n")
        }
    }
}

/// Format a completed restore.
pub fn format_restore(report: &RestoreReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&json!({
            "team": report.team,
            "snapshot": report.snapshot.path.display().to_string(),
            "files_restored": report.files_restored,
            "skipped": report.skipped.iter().map(|s| json!({
                "snapshot": s.path.display().to_string(),
                "reason": s.reason,
            })).collect::<Vec<_>>(),
            "quarantined": report.quarantined.as_ref().map(|p| p.display().to_string()),
        })),
        OutputMode::Human => {
            let mut out = format!(
                "restored {} from {} ({} files written)",
                report.team,
                report.snapshot.file_name(),
                report.files_restored
            );
            for skipped in &report.skipped {
                out.push_str(&format!("\n  skipped {}: {}", skipped.path.display(), skipped.reason));
            }
            if let Some(q) = &report.quarantined {
                out.push_str(&format!("\n  previous board kept at {}", q.display()));
            }
            out
        }
    }
}

/// Format the persisted status document.
pub fn format_status(status: &BackupStatus, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(status)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => {
            let mut lines = vec![format!(
                "last run: {}  overall: {}  snapshots: {} ({})",
                status
                    .last_run
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string()),
                status.overall_status,
                status.total_snapshots,
                human_bytes(status.total_bytes)
            )];
            for (team, t) in &status.teams {
                lines.push(format!(
                    "{:<16} {:<12} backup={} check={} {}",
                    team,
                    t.last_action.map(|a| a.as_str()).unwrap_or("-"),
                    t.last_backup.map(|d| d.to_rfc3339()).unwrap_or_else(|| "-".into()),
                    t.last_check.map(|d| d.to_rfc3339()).unwrap_or_else(|| "-".into()),
                    t.last_message.as_deref().unwrap_or("")
                ));
            }
            lines.join("\n")
        }
    }
}

/// Format prune results.
pub fn format_prune(results: &[TeamPrune], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&Value::Array(
            results
                .iter()
                .map(|r| match &r.result {
                    Ok(p) => json!({
                        "team": r.team,
                        "kept": p.kept,
                        "deleted": p.deleted.iter().map(|d| d.display().to_string()).collect::<Vec<_>>(),
                        "freed_bytes": p.freed_bytes,
                        "failed": p.failed.iter().map(|(d, e)| json!({
                            "snapshot": d.display().to_string(),
                            "error": e,
                        })).collect::<Vec<_>>(),
                        "dry_run": p.dry_run,
                    }),
                    Err(e) => json!({ "team": r.team, "error": e.to_string() }),
                })
                .collect(),
        )),
        OutputMode::Human => results
            .iter()
            .map(|r| match &r.result {
                Ok(p) => {
                    let verb = if p.dry_run { "would delete" } else { "deleted" };
                    let mut line = format!(
                        "{:<16} kept {}, {} {} ({})",
                        r.team,
                        p.kept,
                        verb,
                        p.deleted.len(),
                        human_bytes(p.freed_bytes)
                    );
                    for (path, err) in &p.failed {
                        line.push_str(&format!("\n  failed {}: {}", path.display(), err));
                    }
                    line
                }
                Err(e) => format!("{:<16} (error) {}", r.team, e),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Format a snapshot listing.
pub fn format_snapshots(entries: &[SnapshotEntry], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => pretty(&Value::Array(
            entries
                .iter()
                .map(|e| {
                    json!({
                        "name": e.file_name(),
                        "timestamp": e.timestamp.to_rfc3339(),
                        "size_bytes": e.size_bytes,
                    })
                })
                .collect(),
        )),
        OutputMode::Human if entries.is_empty() => "(no snapshots)".to_string(),
        OutputMode::Human => entries
            .iter()
            .map(|e| format!("{}  {:>10}", e.file_name(), human_bytes(e.size_bytes)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
