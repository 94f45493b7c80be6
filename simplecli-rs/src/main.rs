use std::process::ExitCode;

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use simplecli::cli;
use simplecli::{LineEditor, LuaEngine, Output, Shell, ShellConfig, ShellError};

fn main() -> ExitCode {
    // Diagnostics go to stderr and stay silent unless RUST_LOG asks for them.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            println!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Interpreter errors are not `Send + Sync`, so they cross into `anyhow`
/// as their rendered text.
fn startup(e: impl Into<ShellError>) -> anyhow::Error {
    anyhow!("{}", e.into())
}

fn run() -> Result<ExitCode> {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned());

    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(_) => {
            println!("{}", cli::usage(&program));
            return Ok(ExitCode::FAILURE);
        }
    };

    // ── Load the script ───────────────────────────────────────────────────────
    let out = Output::stdout();
    let engine = LuaEngine::new(out)
        .map_err(|e| anyhow!("can't create Lua interpreter: {}", simplecli::lua::summarize(&e)))?;
    engine.load_file(&args.script).map_err(startup)?;

    // ── Seed variables from the command line ─────────────────────────────────
    let vars = engine.vars();
    let decls = vars.declared_scalars().map_err(startup)?;
    let overrides = match cli::parse_overrides(&program, &decls, &args.flags) {
        Ok(o) => o,
        Err(e) => {
            let _ = e.print();
            return Ok(if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS });
        }
    };
    cli::apply_overrides(&vars, overrides).map_err(startup)?;

    // ── Enter the loop ────────────────────────────────────────────────────────
    let config = ShellConfig::from_vars(&vars).map_err(startup)?;
    let history_file = config.history_file.clone();
    let mut shell = Shell::new(engine, config).map_err(startup)?;
    let mut editor = LineEditor::new(history_file).map_err(startup)?;
    shell.run(&mut editor).map_err(startup)?;

    Ok(ExitCode::SUCCESS)
}
