//! The read-eval-print loop.
//!
//! ```text
//!   banner() ──► prompt() ──► read line ──► tokenize ──► help / do_<verb>
//!                   ▲                                          │
//!                   └──────────────────────────────────────────┘
//! ```
//!
//! Everything that goes wrong inside one line (bad quoting, unknown verb, a
//! command raising an error) is printed and the loop carries on.  Only the
//! input source can stop it: end-of-input, or Ctrl-C on an empty line.

use mlua::prelude::*;

use crate::config::{CallingConvention, ShellConfig};
use crate::error::{Result, ShellError};
use crate::input::{LineSource, ReadEvent};
use crate::lua::LuaEngine;
use crate::output::Output;
use crate::registry::{Command, CommandRegistry};
use crate::scratch::ScratchFile;
use crate::var::display_value;

/// Verb intercepted before command lookup.
pub const HELP_VERB: &str = "help";
pub const HELP_HEADER: &str = "Available commands:";

/// Global function called once before the first prompt.
pub const BANNER_FN: &str = "banner";
/// Global function called before every read to produce the prompt.
pub const PROMPT_FN: &str = "prompt";

/// The interactive shell: a loaded script, its command table, and the loop.
pub struct Shell {
    engine: LuaEngine,
    registry: CommandRegistry,
    config: ShellConfig,
    prompt: String,
}

impl Shell {
    /// Build the command registry from the loaded script.
    pub fn new(engine: LuaEngine, config: ShellConfig) -> Result<Self> {
        let registry = CommandRegistry::discover(&engine, config.calling_convention)?;
        let prompt = config.prompt.clone();
        Ok(Self { engine, registry, config, prompt })
    }

    pub fn engine(&self) -> &LuaEngine {
        &self.engine
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    fn out(&self) -> &Output {
        self.engine.output()
    }

    // ── Loop ──────────────────────────────────────────────────────────────

    /// Run until the input source stops.
    pub fn run(&mut self, input: &mut dyn LineSource) -> Result<()> {
        self.show_banner();

        loop {
            self.refresh_prompt();
            match input.read_line(&self.prompt)? {
                ReadEvent::Interrupted { had_input: false } | ReadEvent::Eof => break,
                ReadEvent::Interrupted { had_input: true } => continue,
                ReadEvent::Line(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    input.add_history(line);
                    self.execute_line(line);
                }
            }
        }

        tracing::debug!("input finished, leaving loop");
        Ok(())
    }

    fn show_banner(&self) {
        match self.engine.call_hook(BANNER_FN) {
            Ok(Some(LuaValue::Nil)) | Ok(None) => {}
            Ok(Some(text)) => self.out().line(display_value(&text)),
            Err(e) => self.out().line(crate::lua::summarize(&e)),
        }
    }

    /// Ask the script for a prompt; keep the previous one if it has no
    /// `prompt()` or the call fails.
    fn refresh_prompt(&mut self) {
        match self.engine.call_hook(PROMPT_FN) {
            Ok(Some(value)) => self.prompt = display_value(&value),
            Ok(None) => {}
            Err(e) => self.out().line(crate::lua::summarize(&e)),
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    /// Run one line, reporting any failure.  Never fails itself.
    pub fn execute_line(&self, line: &str) {
        if let Err(e) = self.dispatch(line.trim()) {
            tracing::debug!(error = ?e, "line failed");
            self.out().line(e.to_string());
        }
    }

    fn dispatch(&self, line: &str) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }
        let words = tokenize(line)?;
        let Some((verb, args)) = words.split_first() else {
            return Ok(());
        };
        tracing::debug!(verb = %verb, args = args.len(), "dispatch");

        if verb == HELP_VERB {
            return self.help(args.first().map(String::as_str));
        }

        let command = self.registry.resolve(verb)?;
        invoke(&self.engine, command, self.config.calling_convention, verb, args)
    }

    fn help(&self, topic: Option<&str>) -> Result<()> {
        match topic {
            None => {
                self.out().line(HELP_HEADER);
                for name in self.registry.names() {
                    self.out().line(name);
                }
            }
            Some(verb) => {
                for line in self.registry.help_for(verb)?.lines() {
                    self.out().line(line);
                }
            }
        }
        Ok(())
    }
}

/// Split a line into shell words.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    shlex::split(line)
        .ok_or_else(|| ShellError::Tokenize("unterminated quote or trailing escape".into()))
}

/// Call `command` with `args` (and the verb, under the verb-first
/// convention).  A scratch file lives exactly as long as the call.
fn invoke(
    engine: &LuaEngine,
    command: &Command,
    convention: CallingConvention,
    verb: &str,
    args: &[String],
) -> Result<()> {
    let lua = engine.lua();
    let mut params: Vec<LuaValue> = Vec::with_capacity(3);
    if convention == CallingConvention::VerbFirst {
        params.push(LuaValue::String(lua.create_string(verb)?));
    }
    let arg_table = lua.create_sequence_from(args.iter().map(String::as_str))?;
    params.push(LuaValue::Table(arg_table));

    if !command.needs_scratch {
        return call(command, params);
    }

    let scratch = ScratchFile::create().map_err(ShellError::Scratch)?;
    let path = scratch.path().to_string_lossy().to_string();
    params.push(LuaValue::String(lua.create_string(&path)?));
    let result = call(command, params);
    scratch.remove();
    result
}

fn call(command: &Command, params: Vec<LuaValue>) -> Result<()> {
    command
        .function()
        .call::<()>(LuaMultiValue::from_iter(params))
        .map_err(ShellError::Invocation)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
