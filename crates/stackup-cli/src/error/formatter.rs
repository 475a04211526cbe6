//! Error formatting for CLI output.

use std::error::Error;
use std::fmt::Write as FmtWrite;
use std::io;

use is_terminal::IsTerminal;

use crate::error::CliError;

const RED_BOLD: &str = "\x1b[1;31m";
const CYAN_BOLD: &str = "\x1b[1;36m";
const DIM: &str = "\x1b[90m";
const RESET: &str = "\x1b[0m";

/// Error output formatter
pub struct ErrorFormatter {
    color: bool,
    verbose: bool,
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self {
            color: false,
            verbose: false,
        }
    }

    /// Plain or colored output, as decided by [`stderr_color`].
    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Format and print an error
    pub fn print(&self, error: &CliError) {
        let formatted = self.format(error);
        eprint!("{formatted}");
    }

    /// Format an error to a string
    pub fn format(&self, error: &CliError) -> String {
        let mut output = String::new();

        let prefix = self.paint(RED_BOLD, &format!("error[{}]:", error.code()));
        let _ = writeln!(output, "{prefix} {error}");

        if self.verbose {
            self.format_source_chain(&mut output, error);
        }

        if let Some(hint) = error.hint() {
            let label = self.paint(CYAN_BOLD, "hint:");
            let _ = writeln!(output, "{label} {hint}");
        }

        output
    }

    fn format_source_chain(&self, output: &mut String, error: &CliError) {
        let mut source = error.source();

        while let Some(cause) = source {
            let text = cause.to_string();
            // Skip causes already spelled out in the message.
            if !output.contains(&text) {
                let label = self.paint(DIM, "caused by:");
                let _ = writeln!(output, "  {label} {text}");
            }
            source = cause.source();
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

/// Whether stderr should get ANSI colors: a terminal and `NO_COLOR` unset.
pub fn stderr_color() -> bool {
    io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}
