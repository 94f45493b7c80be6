//! Command registry.
//!
//! Built once after the script has loaded.  Every global function named
//! `do_<name>` becomes a [`Command`]; every global `help_<name>` that is a
//! string or a function becomes help text.  The two tables are independent:
//! a command may lack help and help may exist for no command.
//!
//! Whether a command wants a scratch file is decided here, from the number of
//! parameters its function declares, and never re-checked.

use std::collections::{BTreeMap, HashMap};

use mlua::prelude::*;

use crate::config::CallingConvention;
use crate::error::{Result, ShellError};
use crate::lua::LuaEngine;
use crate::var::{display_value, lua_str};

pub const COMMAND_PREFIX: &str = "do_";
pub const HELP_PREFIX: &str = "help_";

// ── Command ───────────────────────────────────────────────────────────────────

/// A script-defined command.
#[derive(Debug, Clone)]
pub struct Command {
    /// Name with the `do_` prefix stripped.
    pub name: String,
    /// Whether the function receives a scratch-file path after its
    /// arguments.
    pub needs_scratch: bool,
    func: LuaFunction,
}

impl Command {
    pub fn function(&self) -> &LuaFunction {
        &self.func
    }
}

/// Help text for one name: a literal string, or a function returning one.
#[derive(Debug, Clone)]
pub enum HelpText {
    Text(String),
    Deferred(LuaFunction),
}

// ── CommandRegistry ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
    help: HashMap<String, HelpText>,
}

impl CommandRegistry {
    /// Scan the script's globals and classify them by naming convention.
    pub fn discover(engine: &LuaEngine, convention: CallingConvention) -> LuaResult<Self> {
        let mut registry = Self::default();

        for pair in engine.lua().globals().pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            let LuaValue::String(key) = key else { continue };
            let key = lua_str(&key);

            if let Some(name) = key.strip_prefix(COMMAND_PREFIX) {
                if let LuaValue::Function(func) = value {
                    let params = engine.param_count(&func)?;
                    let needs_scratch = params == convention.scratch_arity();
                    tracing::debug!(command = name, params, needs_scratch, "registered command");
                    registry.commands.insert(
                        name.to_owned(),
                        Command { name: name.to_owned(), needs_scratch, func },
                    );
                }
            } else if let Some(name) = key.strip_prefix(HELP_PREFIX) {
                let help = match value {
                    LuaValue::String(s) => HelpText::Text(lua_str(&s)),
                    LuaValue::Function(f) => HelpText::Deferred(f),
                    _ => continue,
                };
                registry.help.insert(name.to_owned(), help);
            }
        }

        tracing::debug!(
            commands = registry.commands.len(),
            help = registry.help.len(),
            "command registry built"
        );
        Ok(registry)
    }

    /// Command names in ascending order.
    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Look up the command for `verb`.
    pub fn resolve(&self, verb: &str) -> Result<&Command> {
        self.commands
            .get(verb)
            .ok_or_else(|| ShellError::UnknownCommand(verb.to_owned()))
    }

    /// Help text for `verb`, tidied for display: surrounding blank lines
    /// dropped and every line trimmed.
    pub fn help_for(&self, verb: &str) -> Result<String> {
        let raw = match self.help.get(verb) {
            Some(HelpText::Text(text)) => text.clone(),
            Some(HelpText::Deferred(f)) => match f.call::<LuaValue>(()) {
                Ok(LuaValue::Nil) => return Err(ShellError::NoHelp(verb.to_owned())),
                Ok(value) => display_value(&value),
                Err(e) => return Err(ShellError::Invocation(e)),
            },
            None => return Err(ShellError::NoHelp(verb.to_owned())),
        };
        Ok(tidy_help(&raw))
    }
}

/// Trim the block, then trim each line.
pub fn tidy_help(raw: &str) -> String {
    raw.trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
