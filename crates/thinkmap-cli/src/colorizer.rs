//! Terminal colorization for status lines
//!
//! Lines starting with a status mark are coloured with crossterm: `✓` green,
//! `✗` red, `⚠` yellow. Everything else passes through untouched.

use crossterm::style::{Color, Stylize};

pub const OK_MARK: char = '✓';
pub const FAIL_MARK: char = '✗';
pub const WARN_MARK: char = '⚠';

/// Kind of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Fail,
    Warn,
}

impl Status {
    pub fn mark(&self) -> char {
        match self {
            Status::Ok => OK_MARK,
            Status::Fail => FAIL_MARK,
            Status::Warn => WARN_MARK,
        }
    }

    fn color(&self) -> Color {
        match self {
            Status::Ok => Color::Green,
            Status::Fail => Color::Red,
            Status::Warn => Color::Yellow,
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        match line.trim_start().chars().next()? {
            OK_MARK => Some(Status::Ok),
            FAIL_MARK => Some(Status::Fail),
            WARN_MARK => Some(Status::Warn),
            _ => None,
        }
    }
}

/// `"<mark> <text>"`
pub fn status_line(status: Status, text: &str) -> String {
    format!("{} {}", status.mark(), text)
}

/// Colour every status line of `input`
pub fn colorize_output(input: &str) -> String {
    let mut result = String::with_capacity(input.len() * 2);

    for line in input.lines() {
        match Status::from_line(line) {
            Some(status) => {
                result.push_str(&format!("{}", line.to_string().with(status.color())))
            }
            None => result.push_str(line),
        }
        result.push('\n');
    }

    // Remove trailing newline to match input format
    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lines_are_coloured() {
        let input = format!(
            "{}\n{}\nplain",
            status_line(Status::Ok, "qwen"),
            status_line(Status::Fail, "kimi")
        );
        let output = colorize_output(&input);
        assert!(output.contains("\x1b["));
        assert!(output.contains("qwen"));
        assert!(output.ends_with("plain"));
    }

    #[test]
    fn test_plain_text_untouched() {
        let input = "Supported diagram types:\n  bubble_map\n";
        assert_eq!(colorize_output(input), input);
    }

    #[test]
    fn test_status_marks() {
        assert_eq!(status_line(Status::Warn, "x"), "⚠ x");
        assert_eq!(Status::from_line("  ✗ failed"), Some(Status::Fail));
        assert_eq!(Status::from_line("text"), None);
    }
}
