//! Shared CLI output helpers for consistent operator-facing text.

use std::fmt::Display;

use tabled::{Table, Tabled};

const RULE_WIDTH: usize = 56;

/// Print a section header and separator.
pub fn section(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "─".repeat(RULE_WIDTH));
}

/// Print a simple key/value line.
pub fn key_value(label: &str, value: impl Display) {
    println!("{label:<16} {value}");
}

/// Print a successful status line.
pub fn ok(message: &str) {
    println!("✓ {message}");
}

/// Print a warning status line.
pub fn warn(message: &str) {
    println!("⚠ {message}");
}

/// Print an error status line.
pub fn error(message: &str) {
    eprintln!("✗ {message}");
}

/// Print a table indented under the current section.
pub fn table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).to_string();
    for line in table.lines() {
        println!("  {line}");
    }
}

/// Format an optional number, or `-` when absent.
pub fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.6e}"))
}
