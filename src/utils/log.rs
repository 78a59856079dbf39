//! User-facing status output
//!
//! Every message carries a fixed `[mpa-builder]` prefix on its first line;
//! continuation lines are padded to the prefix width so multi-line output
//! (tool reports, stats summaries) stays aligned.

use colored::{Color, Colorize};
use once_cell::sync::Lazy;
use regex::Regex;

static PREFIX: Lazy<String> = Lazy::new(|| format!("[{}] ", env!("CARGO_PKG_NAME")));

static HAS_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9A-Za-z]").unwrap());

/// Format `data` with the prefix (or padding when `no_prefix`) on each line
pub fn format_message(data: &str, no_prefix: bool, color: Color) -> String {
    let padding = " ".repeat(PREFIX.len());
    let mut message = String::new();

    for (idx, line) in data.lines().enumerate() {
        if idx > 0 {
            message.push('\n');
        }
        if idx == 0 && !no_prefix {
            message.push_str(&PREFIX.as_str().color(color).to_string());
        } else {
            message.push_str(&padding);
        }
        message.push_str(line);
    }

    if message.is_empty() && !no_prefix {
        message.push_str(&PREFIX.as_str().color(color).to_string());
    }

    message
}

fn has_content(message: &str) -> bool {
    HAS_CONTENT.is_match(message)
}

/// Status line on stdout
pub fn info(data: &str) {
    let message = format_message(data, false, Color::Blue);
    if has_content(data) {
        println!("{}", message);
    }
}

/// Success banner, preceded by a blank line
pub fn succeed(data: &str) {
    let message = format_message(data, true, Color::Green);
    println!("\n{}", message.green());
}

/// Failure banner, preceded by a blank line
pub fn fail(data: &str) {
    let message = format_message(data, true, Color::Red);
    println!("\n{}", message.red());
}

pub fn warn(data: &str) {
    let message = format_message(data, false, Color::Yellow);
    if has_content(data) {
        eprintln!("{}", message.yellow());
    }
}

pub fn error(data: &str) {
    let message = format_message(data, false, Color::Red);
    if has_content(data) {
        eprintln!("{}", message.red());
    }
}
