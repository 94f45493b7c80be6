//! Error taxonomy.
//!
//! | Variant          | Phase     | Effect                                      |
//! |------------------|-----------|---------------------------------------------|
//! | `ScriptLoad`     | startup   | fatal, exit status 1                        |
//! | `Input`          | startup   | fatal, exit status 1                        |
//! | `UnknownCommand` | dispatch  | reported, loop continues                    |
//! | `NoHelp`         | dispatch  | reported, loop continues                    |
//! | `Tokenize`       | dispatch  | reported, nothing dispatched                |
//! | `Invocation`     | dispatch  | reported, scratch file still removed        |
//! | `Scratch`        | dispatch  | reported, command not called                |
//! | `VariableType`   | primitive | reported, store unchanged                   |
//! | `EnvVar`         | primitive | reported, environment unchanged             |
//! | `Edit`           | primitive | reported, edit counts as "not modified"     |
//! | `Template`       | primitive | reported, render aborted                    |

use std::path::PathBuf;

use thiserror::Error;

/// Every failure the shell can report.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{}: {}", path.display(), crate::lua::summarize(source))]
    ScriptLoad {
        path: PathBuf,
        #[source]
        source: mlua::Error,
    },

    #[error("can't initialise line editor: {0}")]
    Input(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("No help for command: {0}")]
    NoHelp(String),

    #[error("Error splitting up command string: {0}")]
    Tokenize(String),

    #[error("{}", crate::lua::summarize(.0))]
    Invocation(#[source] mlua::Error),

    #[error("can't create scratch file: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("You must provide a number for numeric variable {0}")]
    VariableType(String),

    #[error("Invalid environment variable name or value: {0:?}")]
    EnvVar(String),

    #[error("{context}: {source}")]
    Edit {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Template(String),

    #[error(transparent)]
    Lua(#[from] mlua::Error),
}

pub type Result<T> = std::result::Result<T, ShellError>;
