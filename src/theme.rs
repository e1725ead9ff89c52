//! Terminal styling.
//!
//! Colors are applied with `colored`; `Theme::set_color(false)` (from
//! `--no-color`) turns every helper into plain text.

use colored::Colorize;

pub struct Theme;

impl Theme {
    /// Force colors on or off for the rest of the process.
    pub fn set_color(enabled: bool) {
        colored::control::set_override(enabled);
    }

    pub fn primary(text: &str) -> String {
        text.bold().to_string()
    }

    pub fn success(text: &str) -> String {
        text.green().to_string()
    }

    pub fn warning(text: &str) -> String {
        text.yellow().to_string()
    }

    pub fn error(text: &str) -> String {
        text.red().bold().to_string()
    }

    pub fn muted(text: &str) -> String {
        text.dimmed().to_string()
    }

    pub fn header(text: &str) -> String {
        text.cyan().bold().to_string()
    }

    pub fn category(text: &str) -> String {
        text.cyan().to_string()
    }

    pub fn value(text: &str) -> String {
        text.bold().to_string()
    }

    pub fn size(text: &str) -> String {
        text.yellow().bold().to_string()
    }

    pub fn command(text: &str) -> String {
        text.green().bold().to_string()
    }

    pub fn divider(width: usize) -> String {
        "-".repeat(width).dimmed().to_string()
    }

    pub fn divider_bold(width: usize) -> String {
        "=".repeat(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_when_disabled() {
        Theme::set_color(false);
        assert_eq!(Theme::size("12 KB"), "12 KB");
        assert_eq!(Theme::divider(3), "---");
        assert_eq!(Theme::divider_bold(2), "==");
    }
}
