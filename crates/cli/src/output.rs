//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// CSV with the producer's column names
    Csv,
}

/// Print a rounded table, or a warning when there is nothing to show
pub fn print_table<T: Tabled>(items: Vec<T>, empty_message: &str) {
    if items.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an optional metric value for a table cell
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => format!("{:.0}", v),
        Some(v) => format!("{:.3}", v),
        None => "-".dimmed().to_string(),
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(value: Option<f64>) -> String {
    const KI: f64 = 1024.0;
    const MI: f64 = KI * 1024.0;
    const GI: f64 = MI * 1024.0;

    match value {
        Some(b) if b >= GI => format!("{:.2}Gi", b / GI),
        Some(b) if b >= MI => format!("{:.2}Mi", b / MI),
        Some(b) if b >= KI => format!("{:.2}Ki", b / KI),
        Some(b) => format!("{:.0}B", b),
        None => "-".dimmed().to_string(),
    }
}

/// Drop counts are highlighted when non-zero
pub fn color_count(count: usize) -> String {
    if count == 0 {
        count.to_string().green().to_string()
    } else {
        count.to_string().yellow().to_string()
    }
}

pub fn yes_no(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_metric() {
        colored::control::set_override(false);
        assert_eq!(format_metric(Some(8.0)), "8");
        assert_eq!(format_metric(Some(0.25)), "0.250");
        assert_eq!(format_metric(None), "-");
    }

    #[test]
    fn test_format_bytes() {
        colored::control::set_override(false);
        assert_eq!(format_bytes(Some(512.0)), "512B");
        assert_eq!(format_bytes(Some(2048.0)), "2.00Ki");
        assert_eq!(format_bytes(Some(3.5 * 1024.0 * 1024.0)), "3.50Mi");
        assert_eq!(format_bytes(Some(1024.0 * 1024.0 * 1024.0)), "1.00Gi");
    }
}
