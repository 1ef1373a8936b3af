//! Formatted output helpers for CLI commands.
//!
//! Tables are rendered to strings so they can be tested; commands print
//! them. Status cells are padded before coloring to keep columns aligned.

use std::fmt::Write as _;

use tenantctl_common::types::{Action, ContainerRecord, ContainerStatus, FleetStats};

const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const STATUS_WIDTH: usize = 18;

/// Pads a status to its column width, optionally colored.
#[must_use]
pub fn format_status(status: ContainerStatus, color: bool) -> String {
    let cell = format!("{:<STATUS_WIDTH$}", status.to_string());
    if !color {
        return cell;
    }
    let paint = match status {
        ContainerStatus::Running => GREEN,
        ContainerStatus::Created | ContainerStatus::Exited => YELLOW,
        ContainerStatus::DockerUnavailable => RED,
        ContainerStatus::NotCreated => DIM,
    };
    format!("{paint}{cell}{RESET}")
}

/// Joins actions as `create,start`, or `-` when none is legal.
#[must_use]
pub fn format_actions(actions: &[Action]) -> String {
    if actions.is_empty() {
        return "-".to_string();
    }
    actions
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Cuts `value` to `width` characters, marking the cut with `~`.
#[must_use]
pub fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

/// Renders one row per container record.
#[must_use]
pub fn containers_table(records: &[ContainerRecord], color: bool) -> String {
    let mut out = String::new();
    let header = format!(
        "{:<20} {:<14} {:<STATUS_WIDTH$} {:<18} {:<16} {}",
        "NAME", "ID", "STATUS", "IMAGE", "PORTS", "ACTIONS"
    );
    if color {
        let _ = writeln!(out, "{BOLD}{header}{RESET}");
    } else {
        let _ = writeln!(out, "{header}");
    }
    for record in records {
        let _ = writeln!(
            out,
            "{:<20} {:<14} {} {:<18} {:<16} {}",
            truncate(&record.name, 20),
            record.id.as_deref().unwrap_or("-"),
            format_status(record.status, color),
            truncate(&record.image, 18),
            truncate(&record.ports, 16),
            format_actions(&record.actions),
        );
    }
    out
}

/// Renders fleet counters as aligned key/value lines.
#[must_use]
pub fn stats_table(stats: &FleetStats) -> String {
    let rows = [
        ("Tenants", stats.total_users),
        ("Containers", stats.total_containers),
        ("Running", stats.running_containers),
        ("Stopped", stats.stopped_containers),
    ];
    rows.iter().fold(String::new(), |mut out, (label, value)| {
        let _ = writeln!(out, "{label:<12} {value}");
        out
    })
}
