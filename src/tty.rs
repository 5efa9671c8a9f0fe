//! Terminal I/O utilities for CLI.
//!
//! Provides TTY detection, the confirmation prompt and progress lines.

use std::io::{self, BufRead, IsTerminal, Write};

use guidregen::regen::{Confirm, Progress, RegenSummary};

pub fn is_stdin_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn is_stderr_tty() -> bool {
    io::stderr().is_terminal()
}

pub fn require_tty_for_interactive() -> bool {
    is_stdin_tty() && is_stderr_tty()
}

pub fn prompt(message: &str) -> guidregen::Result<String> {
    eprint!("{}", message);
    io::stderr().flush().ok();

    let stdin = io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line).map_err(|e| {
        guidregen::Error::internal_io(
            format!("Failed to read input: {}", e),
            Some("read confirmation".to_string()),
        )
    })?;

    Ok(line.trim().to_string())
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", message);
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Asks on the terminal; anything but `y`/`yes` declines.
pub struct TtyConfirm;

impl Confirm for TtyConfirm {
    fn confirm(&mut self, summary: &RegenSummary) -> guidregen::Result<bool> {
        eprintln!("\n{}\n", summary.message());
        let answer = prompt("Regenerate GUIDs? [y/N] ")?;
        Ok(is_yes(&answer))
    }
}

/// Prints one status line per phase each time another tenth completes.
#[derive(Default)]
pub struct StatusProgress {
    label: String,
    bucket: Option<u32>,
}

impl Progress for StatusProgress {
    fn update(&mut self, label: &str, file: &str, fraction: f32) {
        if self.label != label {
            self.label = label.to_string();
            self.bucket = None;
        }

        let bucket = (fraction.clamp(0.0, 1.0) * 10.0) as u32;
        if self.bucket == Some(bucket) {
            return;
        }
        self.bucket = Some(bucket);

        if file.is_empty() {
            status(&format!("[{}] {:>3}%", label, bucket * 10));
        } else {
            status(&format!("[{}] {:>3}% {}", label, bucket * 10, file));
        }
    }
}
