//! Line input: the boundary between the dispatch loop and whatever produces
//! lines.
//!
//! [`LineSource`] hands out one logical line per call and keeps interrupt
//! and end-of-input distinct.  [`LineEditor`] is the interactive
//! implementation built on `rustyline`; [`ScriptedInput`] replays a fixed
//! list of events and is what the tests drive the shell with.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{
    Cmd, ConditionalEventHandler, Editor, Event, EventContext, EventHandler, KeyEvent,
    RepeatCount,
};

use crate::error::{Result, ShellError};

// ── LineSource ────────────────────────────────────────────────────────────────

/// What one read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadEvent {
    Line(String),
    /// Ctrl-C.  `had_input` tells whether the line buffer held any text.
    Interrupted { had_input: bool },
    Eof,
}

pub trait LineSource {
    /// Show `prompt` and read one line.
    fn read_line(&mut self, prompt: &str) -> Result<ReadEvent>;

    /// Called for each non-empty line the shell dispatches.
    fn add_history(&mut self, _line: &str) {}
}

// ── LineEditor ────────────────────────────────────────────────────────────────

/// Records whether the buffer was empty when Ctrl-C was pressed, then
/// interrupts as usual.
struct InterruptProbe {
    had_input: Arc<AtomicBool>,
}

impl ConditionalEventHandler for InterruptProbe {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext,
    ) -> Option<Cmd> {
        self.had_input.store(!ctx.line().is_empty(), Ordering::Relaxed);
        Some(Cmd::Interrupt)
    }
}

/// Interactive line editor with history.
pub struct LineEditor {
    editor: Editor<(), DefaultHistory>,
    had_input: Arc<AtomicBool>,
    history_file: Option<PathBuf>,
}

impl LineEditor {
    /// Create the editor and load history from `history_file` if it exists.
    pub fn new(history_file: Option<PathBuf>) -> Result<Self> {
        let mut editor =
            Editor::<(), DefaultHistory>::new().map_err(|e| ShellError::Input(e.to_string()))?;

        let had_input = Arc::new(AtomicBool::new(false));
        editor.bind_sequence(
            KeyEvent::ctrl('C'),
            EventHandler::Conditional(Box::new(InterruptProbe {
                had_input: Arc::clone(&had_input),
            })),
        );

        if let Some(path) = &history_file {
            if let Err(e) = editor.load_history(path) {
                let not_found = matches!(
                    &e,
                    ReadlineError::Io(io) if io.kind() == std::io::ErrorKind::NotFound
                );
                if !not_found {
                    tracing::warn!(path = %path.display(), error = %e, "can't load history");
                }
            }
        }

        Ok(Self { editor, had_input, history_file })
    }

    fn save_history(&mut self) {
        let Some(path) = &self.history_file else { return };
        if let Some(dir) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!(dir = %dir.display(), error = %e, "can't create history directory");
                return;
            }
        }
        if let Err(e) = self.editor.save_history(path) {
            tracing::warn!(path = %path.display(), error = %e, "can't save history");
        }
    }
}

impl LineSource for LineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadEvent> {
        self.had_input.store(false, Ordering::Relaxed);
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadEvent::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadEvent::Interrupted {
                had_input: self.had_input.load(Ordering::Relaxed),
            }),
            Err(ReadlineError::Eof) => Ok(ReadEvent::Eof),
            Err(e) => Err(ShellError::Input(e.to_string())),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            tracing::warn!(error = %e, "can't add history entry");
        }
    }
}

impl Drop for LineEditor {
    fn drop(&mut self) {
        self.save_history();
    }
}

// ── ScriptedInput ─────────────────────────────────────────────────────────────

/// Replays queued events, then reports end-of-input.  Keeps every prompt it
/// was shown and every history entry it was given.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    events: VecDeque<ReadEvent>,
    pub prompts: Vec<String>,
    pub history: Vec<String>,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = ReadEvent>) -> Self {
        Self { events: events.into_iter().collect(), ..Self::default() }
    }

    /// One `ReadEvent::Line` per entry.
    pub fn lines<S: Into<String>>(lines: impl IntoIterator<Item = S>) -> Self {
        Self::new(lines.into_iter().map(|l| ReadEvent::Line(l.into())))
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<ReadEvent> {
        self.prompts.push(prompt.to_owned());
        Ok(self.events.pop_front().unwrap_or(ReadEvent::Eof))
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_owned());
    }
}
