//! Command-line handling.
//!
//! Usage:
//!   simplecli SCRIPT [--<variable> <value>]…
//!
//! The options after the script path are not fixed: they are derived from
//! the scalars the script declares at top level, one long option per
//! variable.
//!
//! | Declared as | Option form                         |
//! |-------------|-------------------------------------|
//! | string      | `--name <STRING>`                   |
//! | number      | `--name <NUMBER>`                   |
//! | boolean     | `--name` or `--name=<true\|false>`  |

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use mlua::prelude::*;

use crate::var::{Declared, VarKind, VarStore, VarValue};

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed process arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    /// Script defining the shell.
    pub script: PathBuf,
    /// Everything after the script path, parsed once the script is loaded.
    pub flags: Vec<String>,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()`.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Split off the script path (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let (script, flags) = argv.split_first().ok_or_else(|| "missing script path".to_owned())?;
    Ok(CliArgs { script: PathBuf::from(script), flags: flags.to_vec() })
}

/// `Usage: <prog> CONFIGFILE [OPTIONS]`
pub fn usage(program: &str) -> String {
    format!("Usage: {program} CONFIGFILE [OPTIONS]")
}

// ── Script-derived flags ──────────────────────────────────────────────────────

/// Names clap reserves for itself.
const RESERVED: &[&str] = &["help"];

fn flaggable(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('-') && !RESERVED.contains(&name)
}

/// Build the option parser for the declared variables.
pub fn flag_command(program: &str, decls: &[Declared]) -> Command {
    let mut cmd = Command::new(program.to_owned())
        .no_binary_name(true)
        .override_usage(format!("{program} CONFIGFILE [OPTIONS]"));

    for decl in decls.iter().filter(|d| flaggable(&d.name)) {
        let help = format!("Set {} (default: {})", decl.name, decl.shown);
        let arg = Arg::new(decl.name.clone()).long(decl.name.clone()).help(help);
        let arg = match decl.value.kind() {
            VarKind::Str => arg.value_name("STRING").action(ArgAction::Set),
            VarKind::Num => arg
                .value_name("NUMBER")
                .action(ArgAction::Set)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(f64)),
            VarKind::Bool => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(value_parser!(bool)),
        };
        cmd = cmd.arg(arg);
    }
    cmd
}

/// Parse `flags` against the declared variables and return the overrides
/// that were actually given, typed like their declarations.
pub fn parse_overrides(
    program: &str,
    decls: &[Declared],
    flags: &[String],
) -> Result<Vec<(String, VarValue)>, clap::Error> {
    let matches = flag_command(program, decls).try_get_matches_from(flags)?;
    Ok(decls
        .iter()
        .filter(|d| flaggable(&d.name))
        .filter_map(|d| override_for(&matches, &d.name, &d.value))
        .collect())
}

fn override_for(matches: &ArgMatches, name: &str, declared: &VarValue) -> Option<(String, VarValue)> {
    let value = match declared {
        VarValue::Str(_) => VarValue::Str(matches.get_one::<String>(name)?.clone()),
        VarValue::Int(_) => {
            let x = *matches.get_one::<f64>(name)?;
            if x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
                VarValue::Int(x as i64)
            } else {
                VarValue::Num(x)
            }
        }
        VarValue::Num(_) => VarValue::Num(*matches.get_one::<f64>(name)?),
        VarValue::Bool(_) => VarValue::Bool(*matches.get_one::<bool>(name)?),
    };
    Some((name.to_owned(), value))
}

/// Write the overrides into the store.
pub fn apply_overrides(vars: &VarStore, overrides: Vec<(String, VarValue)>) -> LuaResult<()> {
    for (name, value) in overrides {
        tracing::debug!(name = %name, value = ?value, "command-line override");
        vars.set(&name, value)?;
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
