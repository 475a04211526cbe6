//! Output utilities for CLI commands.
//!
//! Status messages go to stderr so stdout stays clean for scripting.

use std::fmt::Display;

pub mod progress;

/// Writes status lines, honouring `--quiet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Printer {
    quiet: bool,
}

impl Printer {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Print a status line to stderr.
    pub fn status(&self, message: impl Display) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }
}
