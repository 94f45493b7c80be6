//! Shell settings read from reserved script globals.
//!
//! | Global        | Type    | Default | Meaning                                  |
//! |---------------|---------|---------|------------------------------------------|
//! | `_prompt`     | string  | `"> "`  | prompt used when no `prompt()` exists    |
//! | `_pass_verb`  | boolean | `false` | pass the verb as a leading argument      |
//! | `_history`    | boolean | `true`  | persist line-editor history across runs  |
//!
//! The leading underscore keeps these out of the derived command-line flags
//! and out of template scopes.

use std::path::PathBuf;

use mlua::prelude::*;

use crate::var::{VarStore, VarValue};

pub const DEFAULT_PROMPT: &str = "> ";

/// How arguments are passed to a command function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallingConvention {
    /// `do_x(args)` / `do_x(args, path)`.
    #[default]
    ArgsOnly,
    /// `do_x(verb, args)` / `do_x(verb, args, path)`: lets one function
    /// serve several verbs.
    VerbFirst,
}

impl CallingConvention {
    /// Declared parameter count that marks a command as wanting a scratch
    /// file.
    pub fn scratch_arity(self) -> usize {
        match self {
            CallingConvention::ArgsOnly => 2,
            CallingConvention::VerbFirst => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShellConfig {
    pub prompt: String,
    pub calling_convention: CallingConvention,
    /// Where the line editor keeps history; `None` disables persistence.
    pub history_file: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_owned(),
            calling_convention: CallingConvention::default(),
            history_file: default_history_file(),
        }
    }
}

impl ShellConfig {
    /// Read the reserved globals, falling back to defaults for anything
    /// absent or of the wrong type.
    pub fn from_vars(vars: &VarStore) -> LuaResult<Self> {
        let mut config = Self::default();

        if let Some(VarValue::Str(prompt)) = vars.get("_prompt")? {
            config.prompt = prompt;
        }
        if vars.get_bool("_pass_verb", false)? {
            config.calling_convention = CallingConvention::VerbFirst;
        }
        if !vars.get_bool("_history", true)? {
            config.history_file = None;
        }

        Ok(config)
    }
}

/// `<data dir>/simplecli/history.txt`, if a home directory is known.
pub fn default_history_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "simplecli")
        .map(|dirs| dirs.data_dir().join("history.txt"))
}
