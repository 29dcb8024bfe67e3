//! Interactive read-query-print loop.
//!
//! Lines are buffered until they form a complete statement (the last
//! significant token is `;`), then run against the session. Errors are
//! reported and the loop keeps going.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::Result;
use crate::execution::Session;
use crate::extract::is_complete_statement;
use crate::output::Printer;

pub const PROMPT: &str = ">>> ";
pub const CONTINUATION_PROMPT: &str = "... ";

/// What the loop should do after a line of input.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplInput {
    Exit,
    /// More lines are needed.
    Pending,
    Statement(String),
}

/// Collects input lines until they form a complete statement.
#[derive(Debug, Default)]
pub struct StatementBuffer {
    buf: String,
}

impl StatementBuffer {
    pub fn feed(&mut self, line: &str) -> ReplInput {
        if self.buf.is_empty() {
            let command = line.trim().trim_end_matches(';').trim();
            if command.is_empty() {
                return ReplInput::Pending;
            }
            if command.eq_ignore_ascii_case("exit") || command.eq_ignore_ascii_case("quit") {
                return ReplInput::Exit;
            }
        } else {
            self.buf.push('\n');
        }

        self.buf.push_str(line);
        if is_complete_statement(&self.buf) {
            ReplInput::Statement(std::mem::take(&mut self.buf))
        } else {
            ReplInput::Pending
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Run `sql` and print every statement's result to stdout as it completes.
pub async fn run_query(session: &mut Session, printer: &Printer, sql: &str) -> Result<()> {
    session
        .run_with(sql, |result| printer.print(&result, &mut std::io::stdout().lock()))
        .await
}

pub async fn run_repl(session: &mut Session, printer: &Printer) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    let mut buffer = StatementBuffer::default();

    loop {
        let prompt = if buffer.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        };

        match rl.readline(prompt) {
            Ok(line) => match buffer.feed(&line) {
                ReplInput::Exit => break,
                ReplInput::Pending => {}
                ReplInput::Statement(sql) => {
                    rl.add_history_entry(sql.as_str())?;
                    if let Err(e) = run_query(session, printer, &sql).await {
                        eprintln!("Error: {:#}", anyhow::Error::from(e));
                    }
                }
            },
            // Ctrl-C drops whatever was typed so far
            Err(ReadlineError::Interrupted) => buffer.clear(),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
