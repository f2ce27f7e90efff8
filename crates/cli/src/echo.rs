use owo_colors::OwoColorize;

use crate::VERSION;
use syndic_core::RunReport;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Syndic".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Full-content feeds from obfuscated article sources\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print per-run counters
pub fn print_report(report: &RunReport, elapsed: std::time::Duration) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Feed Summary".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    eprintln!("  {} {}", "Full bodies:".dimmed(), report.full.to_string().bright_green());
    let fallbacks = report.fallbacks.to_string();
    if report.fallbacks > 0 {
        eprintln!("  {} {}", "Teasers kept:".dimmed(), fallbacks.bright_yellow());
    } else {
        eprintln!("  {} {}", "Teasers kept:".dimmed(), fallbacks.bright_white());
    }
    eprintln!("  {} {}", "Batches:".dimmed(), report.batches.to_string().bright_white());
    eprintln!("  {} {:.2}s\n", "Elapsed:".dimmed(), elapsed.as_secs_f64());
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
