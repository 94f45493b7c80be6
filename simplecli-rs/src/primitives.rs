//! Stateful primitives exposed to scripts.
//!
//! Each function performs one operation and returns the confirmation line
//! (`name=value`) the caller should print.  Bindings into Lua live in
//! [`crate::lua`]; this module has no knowledge of how the text reaches the
//! user.
//!
//! | Lua global      | Function             |
//! |-----------------|----------------------|
//! | `cli_variable`  | [`variable`]         |
//! | `cli_envvar`    | [`envvar`]           |
//! | `cli_toggle`    | [`toggle`]           |
//! | `cli_cd`        | [`change_dir`]       |
//! | `cli_edit`      | [`edit`]             |

use std::path::Path;
use std::process::Command;
use std::time::SystemTime;

use mlua::prelude::*;

use crate::error::{Result, ShellError};
use crate::var::{display_value, VarKind, VarStore, VarValue};

/// Editor used when `EDITOR` is unset or empty.
pub const DEFAULT_EDITOR: &str = "vi";

// ── Variables ─────────────────────────────────────────────────────────────────

/// Get or set a script variable.
///
/// An empty `value` only reports.  A numeric variable only accepts text
/// that parses as a number; anything else is stored as a string.
pub fn variable(vars: &VarStore, name: &str, value: &str) -> Result<String> {
    if !value.is_empty() {
        let declared = vars.get(name)?.map(|v| v.kind());
        let new_value = if declared == Some(VarKind::Num) {
            VarValue::parse_number(value)
                .ok_or_else(|| ShellError::VariableType(name.to_owned()))?
        } else {
            VarValue::Str(value.to_owned())
        };
        vars.set(name, new_value)?;
    }
    Ok(format!("{name}={}", vars.display(name)?))
}

/// Get or set a process environment variable.
///
/// A name that is empty or contains `=` or NUL, or a value containing NUL,
/// is rejected and the environment is left alone.
pub fn envvar(name: &str, value: &str) -> Result<String> {
    if name.is_empty() || name.contains(['=', '\0']) || value.contains('\0') {
        return Err(ShellError::EnvVar(name.to_owned()));
    }
    if !value.is_empty() {
        std::env::set_var(name, value);
    }
    let current = std::env::var(name).unwrap_or_default();
    Ok(format!("{name}={current}"))
}

/// Flip a boolean variable.  Anything but `true` counts as false.
pub fn toggle(vars: &VarStore, name: &str) -> Result<String> {
    let current = matches!(vars.get(name)?, Some(VarValue::Bool(true)));
    vars.set(name, VarValue::Bool(!current))?;
    Ok(format!("{name}={}", vars.display(name)?))
}

// ── Path variables ────────────────────────────────────────────────────────────

/// Get or update a variable holding a POSIX-style absolute directory.
pub fn change_dir(vars: &VarStore, name: &str, value: &str) -> Result<String> {
    if !value.is_empty() {
        let current = match vars.raw(name)? {
            LuaValue::Nil => String::new(),
            v => display_value(&v),
        };
        vars.set(name, VarValue::Str(resolve_path(&current, value)))?;
    }
    Ok(format!("{name}={}", vars.display(name)?))
}

/// Resolve `input` against the directory `current`.
///
/// Absolute input replaces `current` verbatim.  Relative input is applied
/// segment by segment: empty segments and `.` are skipped, `..` pops
/// (never above the root), anything else is appended.  The result of a
/// relative resolution always starts and ends with exactly one `/`.
pub fn resolve_path(current: &str, input: &str) -> String {
    if input.starts_with('/') {
        return input.to_owned();
    }

    let mut segments: Vec<&str> = current.split('/').filter(|s| !s.is_empty()).collect();

    for part in input.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut resolved = format!("/{}", segments.join("/"));
    if !resolved.ends_with('/') {
        resolved.push('/');
    }
    resolved
}

// ── Editing ───────────────────────────────────────────────────────────────────

/// The editor command: `EDITOR`, or [`DEFAULT_EDITOR`].
pub fn editor_command() -> String {
    std::env::var("EDITOR")
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_owned())
}

/// Open `path` in `editor` and report whether the file was modified.
///
/// The editor runs in the foreground with inherited stdio; its exit status
/// is ignored.  Modification is judged by the file's mtime.
pub fn edit(path: &Path, editor: &str) -> Result<bool> {
    let before = modified(path, "Error getting tempfile modtime")?;

    tracing::debug!(editor, path = %path.display(), "launching editor");
    let status = Command::new(editor)
        .arg(path)
        .status()
        .map_err(|source| ShellError::Edit { context: "Error running editor", source })?;
    tracing::debug!(?status, "editor exited");

    let after = modified(path, "Error getting modtime")?;
    Ok(after != before)
}

fn modified(path: &Path, context: &'static str) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|source| ShellError::Edit { context, source })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    fn store(src: &str) -> (Lua, VarStore) {
        let lua = Lua::new();
        lua.load(src).exec().unwrap();
        let vars = VarStore::new(&lua);
        (lua, vars)
    }

    // ── variable ──────────────────────────────────────────────────────────

    #[test]
    fn variable_sets_and_reports() {
        let (_lua, vars) = store("myvar = 'default'");
        assert_eq!(variable(&vars, "myvar", "foo").unwrap(), "myvar=foo");
        assert_eq!(variable(&vars, "myvar", "").unwrap(), "myvar=foo");
    }

    #[test]
    fn variable_reports_undeclared_as_nil() {
        let (_lua, vars) = store("");
        assert_eq!(variable(&vars, "ghost", "").unwrap(), "ghost=nil");
    }

    #[test]
    fn numeric_variable_rejects_text() {
        let (_lua, vars) = store("count = 3");
        let err = variable(&vars, "count", "lots").unwrap_err();
        assert!(matches!(err, ShellError::VariableType(ref n) if n == "count"));
        assert_eq!(vars.get("count").unwrap(), Some(VarValue::Int(3)));
    }

    #[test]
    fn numeric_variable_accepts_numbers() {
        let (_lua, vars) = store("count = 3");
        assert_eq!(variable(&vars, "count", "7").unwrap(), "count=7");
        assert_eq!(variable(&vars, "count", "1.5").unwrap(), "count=1.5");
    }

    // ── envvar ────────────────────────────────────────────────────────────

    #[test]
    fn envvar_sets_process_environment() {
        let name = "SIMPLECLI_TEST_ENVVAR";
        assert_eq!(envvar(name, "xyz").unwrap(), format!("{name}=xyz"));
        assert_eq!(std::env::var(name).unwrap(), "xyz");
        assert_eq!(envvar(name, "").unwrap(), format!("{name}=xyz"));
    }

    #[test]
    fn envvar_reports_unset_as_empty() {
        assert_eq!(
            envvar("SIMPLECLI_TEST_NEVER_SET", "").unwrap(),
            "SIMPLECLI_TEST_NEVER_SET="
        );
    }

    #[test]
    fn envvar_rejects_bad_names_and_values() {
        let cases = [
            ("", "x"),
            ("A=B", "x"),
            ("NUL\0NAME", ""),
            ("SIMPLECLI_TEST_NUL", "a\0b"),
        ];
        for (name, value) in cases {
            assert!(
                matches!(envvar(name, value), Err(ShellError::EnvVar(_))),
                "{name:?}={value:?}"
            );
        }
        assert!(std::env::var_os("SIMPLECLI_TEST_NUL").is_none());
    }

    // ── toggle ────────────────────────────────────────────────────────────

    #[test]
    fn toggle_from_undeclared() {
        let (_lua, vars) = store("");
        assert_eq!(toggle(&vars, "debug_mode").unwrap(), "debug_mode=true");
        assert_eq!(toggle(&vars, "debug_mode").unwrap(), "debug_mode=false");
    }

    #[test]
    fn toggle_treats_non_boolean_as_false() {
        let (_lua, vars) = store("verbose = 'yes'");
        assert_eq!(toggle(&vars, "verbose").unwrap(), "verbose=true");
    }

    // ── paths ─────────────────────────────────────────────────────────────

    #[test]
    fn resolve_relative_then_parent() {
        let p = resolve_path("/", "a/b");
        assert_eq!(p, "/a/b/");
        assert_eq!(resolve_path(&p, ".."), "/a/");
    }

    #[test]
    fn resolve_absolute_is_verbatim() {
        assert_eq!(resolve_path("/a/", "/etc/x"), "/etc/x");
    }

    #[test]
    fn resolve_dot_is_identity() {
        assert_eq!(resolve_path("/a/b/", "."), "/a/b/");
        assert_eq!(resolve_path("/", "."), "/");
    }

    #[test]
    fn resolve_parent_stops_at_root() {
        assert_eq!(resolve_path("/", "../../x"), "/x/");
    }

    #[test]
    fn resolve_collapses_repeated_slashes() {
        assert_eq!(resolve_path("/", "docs//"), "/docs/");
        assert_eq!(resolve_path("/a/", "b//c/"), "/a/b/c/");
        assert_eq!(resolve_path("/abs//set/", "x"), "/abs/set/x/");
    }

    #[test]
    fn resolve_from_unset_defaults_to_root() {
        assert_eq!(resolve_path("", "docs"), "/docs/");
    }

    #[test]
    fn change_dir_empty_is_read_only() {
        let (_lua, vars) = store("cwd = '/srv/'");
        assert_eq!(change_dir(&vars, "cwd", "").unwrap(), "cwd=/srv/");
        assert_eq!(change_dir(&vars, "cwd", "www").unwrap(), "cwd=/srv/www/");
    }

    // ── edit ──────────────────────────────────────────────────────────────

    #[test]
    fn edit_missing_file_is_an_edit_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = edit(&dir.path().join("absent"), "true").unwrap_err();
        assert!(matches!(err, ShellError::Edit { .. }));
    }

    #[test]
    fn edit_with_noop_editor_is_unchanged() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert!(!edit(f.path(), "true").unwrap());
    }

    #[test]
    fn edit_with_missing_editor_is_an_edit_error() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let err = edit(f.path(), "/nonexistent/simplecli-editor").unwrap_err();
        assert!(matches!(err, ShellError::Edit { .. }));
    }

    /// An "editor" that rewrites the file and pins its mtime to 2001, so the
    /// change is visible regardless of timestamp granularity.
    #[cfg(unix)]
    fn rewriting_editor(dir: &Path) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("rewriting-editor");
        std::fs::write(&script, "#!/bin/sh\nprintf edited > \"$1\"\ntouch -t 200101010000 \"$1\"\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn edit_that_changes_mtime_is_modified() {
        let dir = tempfile::tempdir().unwrap();
        let editor = rewriting_editor(dir.path());
        let file = dir.path().join("body.txt");
        std::fs::write(&file, "").unwrap();

        assert!(edit(&file, editor.to_str().unwrap()).unwrap());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "edited");
    }
}
