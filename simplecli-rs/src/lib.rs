//! An interactive command shell whose commands come from a Lua script.
//!
//! The script supplies the command set: each global function `do_<name>`
//! is a command, `help_<name>` is its help text, `banner()` and `prompt()`
//! customise the session, and top-level scalars become variables that can
//! be seeded from the command line and changed with the `cli_*` primitives.
//!
//! ```rust
//! use simplecli::{LuaEngine, Output, ScriptedInput, Shell, ShellConfig};
//!
//! let engine = LuaEngine::new(Output::capture()).unwrap();
//! engine.exec("name = 'world'; function do_hi(args) cli_variable('name', args[1]) end").unwrap();
//! let config = ShellConfig::from_vars(&engine.vars()).unwrap();
//! let mut shell = Shell::new(engine, config).unwrap();
//! shell.run(&mut ScriptedInput::lines(["hi there"])).unwrap();
//! assert_eq!(shell.engine().output().take(), vec!["name=there"]);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod lua;
pub mod output;
pub mod primitives;
pub mod registry;
pub mod scratch;
pub mod shell;
pub mod template;
pub mod var;

pub use config::{CallingConvention, ShellConfig};
pub use error::{Result, ShellError};
pub use input::{LineEditor, LineSource, ReadEvent, ScriptedInput};
pub use lua::LuaEngine;
pub use output::Output;
pub use registry::{Command, CommandRegistry};
pub use shell::Shell;
pub use var::{Declared, VarStore, VarValue};
