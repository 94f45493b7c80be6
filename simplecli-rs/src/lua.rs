//! Lua 5.4 scripting via the `mlua` crate.
//!
//! [`LuaEngine`] owns the interpreter.  The script defines the shell: its
//! `do_*` functions are commands, `help_*` entries are their help, and its
//! top-level scalars are the variables the primitives work on.
//!
//! # Lua API
//!
//! Registered before the script runs:
//!
//! | Lua function               | Effect                                        |
//! |----------------------------|-----------------------------------------------|
//! | `cli_variable(name [, v])` | Report or set a script variable               |
//! | `cli_envvar(name [, v])`   | Report or set an environment variable         |
//! | `cli_toggle(name)`         | Flip a boolean variable                       |
//! | `cli_cd(name [, v])`       | Report or move a directory-like variable      |
//! | `cli_edit(path)`           | Run `$EDITOR` on a file → bool (modified)     |
//! | `t(template)`              | Render `{{tag}}` placeholders → string or nil |

use std::path::Path;

use mlua::prelude::*;
use mlua::{LuaOptions, StdLib};

use crate::output::Output;
use crate::primitives;
use crate::template::{self, TemplateScope};
use crate::var::VarStore;

/// Defines `t` in Lua so that it can read the locals of whoever called it.
/// Level 2 of `debug.getlocal` is the caller of `t`.  Internal slots such as
/// `(temporary)` are skipped.  When `t` is tail-called (`return t(..)`) the
/// caller's frame is already gone, and when `t` is called straight from the
/// host there is no Lua caller at all; both render with no locals.
const TEMPLATE_PRELUDE: &str = r#"
local render = ...
local getinfo, getlocal = debug.getinfo, debug.getlocal
function t(text)
    local locals = {}
    local frame = getinfo(1, "t")
    local caller = getinfo(2, "S")
    if not frame.istailcall and caller and caller.what ~= "C" then
        local i = 1
        while true do
            local name, value = getlocal(2, i)
            if name == nil then break end
            if string.sub(name, 1, 1) ~= "(" then
                locals[name] = value
            end
            i = i + 1
        end
    end
    return render(text, locals)
end
"#;

// ── Error text ────────────────────────────────────────────────────────────────

/// First line of an interpreter error, without the traceback.
pub fn summarize(err: &LuaError) -> String {
    match err {
        LuaError::CallbackError { cause, .. } => summarize(cause),
        LuaError::WithContext { cause, .. } => summarize(cause),
        LuaError::RuntimeError(msg) | LuaError::SyntaxError { message: msg, .. } => {
            msg.lines().next().unwrap_or_default().to_owned()
        }
        other => other.to_string().lines().next().unwrap_or_default().to_owned(),
    }
}

// ── LuaEngine ─────────────────────────────────────────────────────────────────

/// A Lua interpreter with the shell primitives registered.
pub struct LuaEngine {
    lua: Lua,
    out: Output,
}

impl LuaEngine {
    /// Create the interpreter and register the primitives.  Messages from
    /// primitives are written to `out`.
    pub fn new(out: Output) -> LuaResult<Self> {
        // SAFETY: the debug library is required for caller-local template
        // lookup and parameter counting; script code is trusted.
        let lua = unsafe { Lua::unsafe_new_with(StdLib::ALL_SAFE | StdLib::DEBUG, LuaOptions::new()) };
        Self::register_api(&lua, &out)?;
        Ok(Self { lua, out })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn output(&self) -> &Output {
        &self.out
    }

    pub fn vars(&self) -> VarStore {
        VarStore::new(&self.lua)
    }

    // ── API registration ──────────────────────────────────────────────────

    fn register_api(lua: &Lua, out: &Output) -> LuaResult<()> {
        let globals = lua.globals();

        // cli_variable(name [, value])
        {
            let out = out.clone();
            globals.set(
                "cli_variable",
                lua.create_function(move |lua, (name, value): (String, Option<String>)| {
                    let vars = VarStore::new(lua);
                    match primitives::variable(&vars, &name, value.as_deref().unwrap_or("")) {
                        Ok(line) => out.line(line),
                        Err(e) => out.line(e.to_string()),
                    }
                    Ok(())
                })?,
            )?;
        }

        // cli_envvar(name [, value])
        {
            let out = out.clone();
            globals.set(
                "cli_envvar",
                lua.create_function(move |_, (name, value): (String, Option<String>)| {
                    match primitives::envvar(&name, value.as_deref().unwrap_or("")) {
                        Ok(line) => out.line(line),
                        Err(e) => out.line(e.to_string()),
                    }
                    Ok(())
                })?,
            )?;
        }

        // cli_toggle(name)
        {
            let out = out.clone();
            globals.set(
                "cli_toggle",
                lua.create_function(move |lua, name: String| {
                    let vars = VarStore::new(lua);
                    match primitives::toggle(&vars, &name) {
                        Ok(line) => out.line(line),
                        Err(e) => out.line(e.to_string()),
                    }
                    Ok(())
                })?,
            )?;
        }

        // cli_cd(name [, value])
        {
            let out = out.clone();
            globals.set(
                "cli_cd",
                lua.create_function(move |lua, (name, value): (String, Option<String>)| {
                    let vars = VarStore::new(lua);
                    match primitives::change_dir(&vars, &name, value.as_deref().unwrap_or("")) {
                        Ok(line) => out.line(line),
                        Err(e) => out.line(e.to_string()),
                    }
                    Ok(())
                })?,
            )?;
        }

        // cli_edit(path) → bool
        {
            let out = out.clone();
            globals.set(
                "cli_edit",
                lua.create_function(move |_, path: String| {
                    let editor = primitives::editor_command();
                    match primitives::edit(Path::new(&path), &editor) {
                        Ok(true) => Ok(true),
                        Ok(false) => {
                            out.line("File was unchanged");
                            Ok(false)
                        }
                        Err(e) => {
                            out.line(e.to_string());
                            Ok(false)
                        }
                    }
                })?,
            )?;
        }

        // t(template) → string | nil
        {
            let out = out.clone();
            let render = lua.create_function(
                move |lua, (text, locals): (String, Option<LuaTable>)| {
                    let scope = TemplateScope::build(lua, locals.as_ref())?;
                    match template::render(&text, &scope) {
                        Ok(rendered) => Ok(Some(rendered)),
                        Err(e) => {
                            tracing::debug!(error = %e, "template render failed");
                            out.line(e.to_string());
                            Ok(None)
                        }
                    }
                },
            )?;
            lua.load(TEMPLATE_PRELUDE)
                .set_name("=template")
                .call::<()>(render)?;
        }

        Ok(())
    }

    // ── Script loading ────────────────────────────────────────────────────

    /// Load and execute the script that defines the shell.
    pub fn load_file(&self, path: &Path) -> crate::Result<()> {
        tracing::debug!(path = %path.display(), "loading script");
        self.lua
            .load(path)
            .exec()
            .map_err(|source| crate::ShellError::ScriptLoad { path: path.to_owned(), source })
    }

    /// Execute a Lua chunk string.
    pub fn exec(&self, chunk: &str) -> LuaResult<()> {
        self.lua.load(chunk).exec()
    }

    /// Evaluate a Lua expression string.
    pub fn eval<R: FromLuaMulti>(&self, expr: &str) -> LuaResult<R> {
        self.lua.load(expr).eval()
    }

    // ── Introspection ─────────────────────────────────────────────────────

    /// A global function by name, if the global holds one.
    pub fn function(&self, name: &str) -> LuaResult<Option<LuaFunction>> {
        match self.lua.globals().get::<LuaValue>(name)? {
            LuaValue::Function(f) => Ok(Some(f)),
            _ => Ok(None),
        }
    }

    /// Number of declared positional parameters of `f` (0 for native
    /// functions).
    pub fn param_count(&self, f: &LuaFunction) -> LuaResult<usize> {
        let debug: LuaTable = self.lua.globals().get("debug")?;
        let getinfo: LuaFunction = debug.get("getinfo")?;
        let info: LuaTable = getinfo.call((f.clone(), "u"))?;
        let n: Option<i64> = info.get("nparams")?;
        Ok(n.unwrap_or(0).max(0) as usize)
    }

    /// Call a global function with no arguments and return its first
    /// result.  `Ok(None)` if no such function exists.
    pub fn call_hook(&self, name: &str) -> LuaResult<Option<LuaValue>> {
        match self.function(name)? {
            Some(f) => f.call::<LuaValue>(()).map(Some),
            None => Ok(None),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_engine() -> LuaEngine {
        LuaEngine::new(Output::capture()).unwrap()
    }

    // ── primitives ────────────────────────────────────────────────────────

    #[test]
    fn cli_variable_prints_confirmation() {
        let eng = make_engine();
        eng.exec("myvar = 'default'; cli_variable('myvar', 'foo'); cli_variable('myvar')")
            .unwrap();
        assert_eq!(eng.output().take(), vec!["myvar=foo", "myvar=foo"]);
    }

    #[test]
    fn cli_variable_type_error_is_reported_not_raised() {
        let eng = make_engine();
        eng.exec("n = 1; cli_variable('n', 'abc')").unwrap();
        assert_eq!(
            eng.output().take(),
            vec!["You must provide a number for numeric variable n"]
        );
        let n: i64 = eng.eval("n").unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn cli_toggle_flips() {
        let eng = make_engine();
        eng.exec("cli_toggle('debug_mode'); cli_toggle('debug_mode')").unwrap();
        assert_eq!(eng.output().take(), vec!["debug_mode=true", "debug_mode=false"]);
    }

    #[test]
    fn cli_cd_resolves() {
        let eng = make_engine();
        eng.exec("cwd = '/'; cli_cd('cwd', 'a/b'); cli_cd('cwd', '..')").unwrap();
        assert_eq!(eng.output().take(), vec!["cwd=/a/b/", "cwd=/a/"]);
    }

    #[test]
    fn cli_envvar_sets() {
        let eng = make_engine();
        eng.exec("cli_envvar('SIMPLECLI_LUA_ENV', 'on')").unwrap();
        assert_eq!(eng.output().take(), vec!["SIMPLECLI_LUA_ENV=on"]);
    }

    #[test]
    fn cli_envvar_bad_name_is_reported_not_raised() {
        let eng = make_engine();
        eng.exec("cli_envvar('A=B', 'x'); after = true").unwrap();
        assert_eq!(
            eng.output().take(),
            vec![r#"Invalid environment variable name or value: "A=B""#]
        );
        let after: bool = eng.eval("after").unwrap();
        assert!(after);
    }

    #[test]
    fn cli_edit_missing_file_returns_false() {
        let eng = make_engine();
        let v: bool = eng.eval("cli_edit('/nonexistent/simplecli/file')").unwrap();
        assert!(!v);
        assert_eq!(eng.output().take().len(), 1);
    }

    // ── templates ─────────────────────────────────────────────────────────

    #[test]
    fn t_sees_caller_locals() {
        let eng = make_engine();
        eng.exec(
            "greeting = 'hi'
             function greet(args)
                 local who = 'world'
                 local text = t('{{greeting}} {{who}} {{args[1]}}')
                 return text
             end",
        )
        .unwrap();
        let v: String = eng.eval("greet({'again'})").unwrap();
        assert_eq!(v, "hi world again");
    }

    #[test]
    fn t_tail_call_renders_without_locals() {
        let eng = make_engine();
        eng.exec(
            "host = 'example.com'
             function prompt() return t('{{host}}> ') end
             function shadowed() local host = 'hidden'; return inner() end
             function inner() return t('{{host}}') end",
        )
        .unwrap();
        let v: String = eng.eval("prompt()").unwrap();
        assert_eq!(v, "example.com> ");
        let v: String = eng.eval("shadowed()").unwrap();
        assert_eq!(v, "example.com");
        assert!(eng.output().take().is_empty());
    }

    #[test]
    fn t_called_from_host_has_no_locals() {
        let eng = make_engine();
        eng.exec("greeting = 'hi'").unwrap();
        let t: LuaFunction = eng.lua().globals().get("t").unwrap();
        let v: String = t.call("{{greeting}}").unwrap();
        assert_eq!(v, "hi");
    }

    #[test]
    fn t_uses_lua_number_forms() {
        let eng = make_engine();
        eng.exec("x = 0.1 + 0.2; y = 1e20; z = 1e-5; w = 8.0").unwrap();
        let v: String = eng.eval("t('{{x}}|{{y}}|{{z}}|{{w}}')").unwrap();
        assert_eq!(v, "0.3|1e+20|1e-05|8.0");
    }

    #[test]
    fn t_calls_functions() {
        let eng = make_engine();
        eng.exec("function host() return 'example.com' end").unwrap();
        let v: String = eng.eval("t('https://{{host}}/')").unwrap();
        assert_eq!(v, "https://example.com/");
    }

    #[test]
    fn t_error_returns_nil_and_reports() {
        let eng = make_engine();
        let v: LuaValue = eng.eval("t('{{oops')").unwrap();
        assert!(v.is_nil());
        assert_eq!(eng.output().take().len(), 1);
    }

    // ── introspection ─────────────────────────────────────────────────────

    #[test]
    fn param_count_reads_declared_parameters() {
        let eng = make_engine();
        eng.exec("function one(a) end; function two(a, b) end; function none() end")
            .unwrap();
        let one = eng.function("one").unwrap().unwrap();
        let two = eng.function("two").unwrap().unwrap();
        let none = eng.function("none").unwrap().unwrap();
        assert_eq!(eng.param_count(&one).unwrap(), 1);
        assert_eq!(eng.param_count(&two).unwrap(), 2);
        assert_eq!(eng.param_count(&none).unwrap(), 0);
    }

    #[test]
    fn function_ignores_non_callables() {
        let eng = make_engine();
        eng.exec("notfn = 'text'").unwrap();
        assert!(eng.function("notfn").unwrap().is_none());
        assert!(eng.function("absent").unwrap().is_none());
    }

    #[test]
    fn call_hook_missing_is_none() {
        let eng = make_engine();
        assert!(eng.call_hook("banner").unwrap().is_none());
        eng.exec("function banner() return 'welcome' end").unwrap();
        let v = eng.call_hook("banner").unwrap().unwrap();
        assert_eq!(crate::var::display_value(&v), "welcome");
    }

    // ── load_file ─────────────────────────────────────────────────────────

    #[test]
    fn load_file_executes_script() {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "loaded = true").unwrap();
        let eng = make_engine();
        eng.load_file(f.path()).unwrap();
        let v: bool = eng.eval("loaded").unwrap();
        assert!(v);
    }

    #[test]
    fn load_file_reports_missing_script() {
        let eng = make_engine();
        let err = eng.load_file(Path::new("/nonexistent/script.lua")).unwrap_err();
        assert!(matches!(err, crate::ShellError::ScriptLoad { .. }));
    }

    #[test]
    fn summarize_strips_traceback() {
        let eng = make_engine();
        eng.exec("function boom() error('kaboom') end").unwrap();
        let err = eng.function("boom").unwrap().unwrap().call::<()>(()).unwrap_err();
        let text = summarize(&err);
        assert!(text.ends_with("kaboom"), "{text}");
        assert!(!text.contains('\n'));
    }
}
