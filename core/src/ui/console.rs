use colored::Colorize;
use std::fmt::Display;

/// Progress messages for the operator. Quiet mode silences everything
/// except notices and warnings.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn section(&self, title: &str) {
        if !self.quiet {
            println!("\n\n{} {}", "===>".cyan().bold(), title.bold());
        }
    }

    pub fn info(&self, message: impl Display) {
        if !self.quiet {
            println!("{}", message);
        }
    }

    /// Shown even in quiet mode
    pub fn notice(&self, message: impl Display) {
        println!("{}", message);
    }

    pub fn warn(&self, message: impl Display) {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }

    pub fn success(&self, message: impl Display) {
        if !self.quiet {
            println!("{} {}", "✓".green().bold(), message);
        }
    }

    pub fn failure(&self, message: impl Display) {
        eprintln!("{} {}", "✗".red().bold(), message);
    }
}
