//! Console rendering helpers for job progress.
//!
//! Failure details come straight from the store and can be arbitrarily long;
//! everything printed per document goes through [`compact_line`].

use colored::Colorize;

/// Collapse newlines/extra whitespace and bound length for terminal display.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let preview: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

pub fn header(title: &str) {
    println!("{}", format!("=== {} ===", title).bright_white().bold());
}

pub fn warn(message: &str) {
    eprintln!("{} {}", "warning:".bright_yellow().bold(), compact_line(message, 240));
}

/// `<name>: key=value, key=value` with the name highlighted.
pub fn counters_line(name: &str, counters: &[(&str, u64)]) -> String {
    let rendered = counters
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}: {}", name, rendered)
}
