//! Formatted output helpers for CLI commands.
//!
//! Everything here writes to stderr; stdout is reserved for the container.

#![allow(clippy::print_stderr)]

use minicontainer_image::extract::ExtractSummary;
use minicontainer_image::provision::Step;

const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Number of numbered provisioning steps.
const TOTAL_STEPS: u8 = 5;

/// Prints one provisioning progress line.
pub fn print_step(step: &Step<'_>) {
    eprintln!("{}", render_step(step));
}

/// Renders a progress line such as `[2/5] Downloading ...`.
#[must_use]
pub fn render_step(step: &Step<'_>) -> String {
    let text = match step {
        Step::Downloaded { bytes } => format!("Downloaded {}", format_bytes(*bytes)),
        Step::Done { .. } => format!("{GREEN}{step}{RESET}"),
        other => other.to_string(),
    };
    format!("{BOLD}[{}/{TOTAL_STEPS}]{RESET} {text}", step.number())
}

/// Prints what an extraction wrote.
pub fn print_summary(summary: &ExtractSummary) {
    eprintln!(
        "      {} directories, {} files, {} symlinks ({} skipped)",
        summary.directories, summary.files, summary.symlinks, summary.skipped
    );
}

/// Prints a terminal error with its cause chain.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{RED}error:{RESET} {err:#}");
}

/// Formats a byte count into a human-readable string (e.g., "128 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}
