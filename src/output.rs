//! User-facing status lines.
//!
//! Diagnostics for developers go through `tracing`; this is what the user reads.

use crossterm::style::Stylize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Ok,
    Error,
    Warning,
    Info,
    Debug,
}

#[derive(Debug, Clone, Copy)]
pub struct Output {
    color: bool,
    verbose: bool,
}

impl Output {
    pub fn new(color: bool, verbose: bool) -> Self {
        Self { color, verbose }
    }

    pub fn plain() -> Self {
        Self::new(false, false)
    }

    pub fn icon(&self, icon: Icon) -> &'static str {
        match (icon, self.color) {
            (Icon::Ok, true) => "\u{2713}",
            (Icon::Ok, false) => "[ok]",
            (Icon::Error, true) => "\u{2717}",
            (Icon::Error, false) => "[x]",
            (Icon::Warning, true) => "\u{26a0}",
            (Icon::Warning, false) => "[!]",
            (Icon::Info, true) => "\u{2139}",
            (Icon::Info, false) => "[i]",
            (Icon::Debug, true) => "\u{2699}",
            (Icon::Debug, false) => "[d]",
        }
    }

    pub fn success(&self, message: &str) {
        println!("{}", self.format_success(message));
    }

    pub fn info(&self, message: &str) {
        println!("{}", self.format_info(message));
    }

    pub fn warning(&self, message: &str) {
        println!("{}", self.format_warning(message));
    }

    /// Errors always go to stderr as a single line.
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.format_error(message));
    }

    /// Printed only with `--verbose`.
    pub fn detail(&self, message: &str) {
        if self.verbose {
            println!("{} {}", self.icon(Icon::Debug), message);
        }
    }

    /// Raw data for stdout (labels, tables, paths).
    pub fn data(&self, text: &str) {
        println!("{text}");
    }

    pub fn heading(&self, text: &str) -> String {
        if self.color {
            text.to_string().bold().cyan().to_string()
        } else {
            text.to_string()
        }
    }

    fn format_success(&self, message: &str) -> String {
        let line = format!("{} {}", self.icon(Icon::Ok), message);
        if self.color {
            line.green().bold().to_string()
        } else {
            line
        }
    }

    fn format_info(&self, message: &str) -> String {
        let icon = self.icon(Icon::Info);
        if self.color {
            format!("{} {}", icon.blue().bold(), message)
        } else {
            format!("{icon} {message}")
        }
    }

    fn format_warning(&self, message: &str) -> String {
        let line = format!("{} {}", self.icon(Icon::Warning), message);
        if self.color {
            line.yellow().bold().to_string()
        } else {
            line
        }
    }

    fn format_error(&self, message: &str) -> String {
        let line = format!("{} {}", self.icon(Icon::Error), message);
        if self.color {
            line.red().bold().to_string()
        } else {
            line
        }
    }
}
