//! Line reader for the interactive shell.
//!
//! Statements may span lines and end at a `;` that closes a line. Lines
//! starting with `.` outside a statement are shell commands.

/// One unit of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Statement(String),
    Refresh,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP: &str = "\
Enter SQL statements terminated by ';'.
  .refresh   refresh linked tables
  .help      show this help
  .quit      close the database and exit";

/// Accumulates input lines into commands.
#[derive(Debug, Default)]
pub struct ShellInput {
    buffer: String,
}

impl ShellInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line; returns a command once one is complete.
    pub fn push_line(&mut self, line: &str) -> Option<ShellCommand> {
        let trimmed = line.trim();

        if self.buffer.trim().is_empty() {
            if let Some(dot) = trimmed.strip_prefix('.') {
                self.buffer.clear();
                return Some(match dot.to_lowercase().as_str() {
                    "refresh" => ShellCommand::Refresh,
                    "help" => ShellCommand::Help,
                    "quit" | "exit" => ShellCommand::Quit,
                    _ => ShellCommand::Unknown(trimmed.to_string()),
                });
            }
        }

        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line.trim_end());

        if trimmed.ends_with(';') {
            return self.take_statement();
        }
        None
    }

    /// Returns whatever statement is left at end of input.
    pub fn finish(&mut self) -> Option<ShellCommand> {
        self.take_statement()
    }

    /// True while a statement is being continued.
    pub fn is_pending(&self) -> bool {
        !self.buffer.trim().is_empty()
    }

    fn take_statement(&mut self) -> Option<ShellCommand> {
        let text = std::mem::take(&mut self.buffer);
        let sql = text.trim().trim_end_matches(';').trim_end();
        if sql.is_empty() {
            return None;
        }
        Some(ShellCommand::Statement(sql.to_string()))
    }
}
