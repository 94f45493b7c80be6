//! Variable store.
//!
//! The store *is* the Lua global table: scripts declare variables as plain
//! top-level assignments and the primitives read and write the same table.
//! [`VarStore`] is a typed view over it; [`VarValue`] models the three
//! scalar kinds a variable can hold.

use mlua::prelude::*;

// ── VarValue ──────────────────────────────────────────────────────────────────

/// A scalar script variable.
///
/// Lua 5.4 distinguishes integer and float numbers; both count as the
/// numeric kind but keep their own string form.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    Str(String),
    Int(i64),
    Num(f64),
    Bool(bool),
}

/// The declared type of a variable, used for flag derivation and for
/// validating assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Str,
    Num,
    Bool,
}

impl VarValue {
    pub fn kind(&self) -> VarKind {
        match self {
            VarValue::Str(_) => VarKind::Str,
            VarValue::Int(_) | VarValue::Num(_) => VarKind::Num,
            VarValue::Bool(_) => VarKind::Bool,
        }
    }

    /// Convert a Lua value; `None` for nil, tables, functions and the rest.
    pub fn from_lua_value(value: &LuaValue) -> Option<Self> {
        match value {
            LuaValue::String(s) => Some(VarValue::Str(lua_str(s))),
            LuaValue::Integer(i) => Some(VarValue::Int(*i)),
            LuaValue::Number(n) => Some(VarValue::Num(*n)),
            LuaValue::Boolean(b) => Some(VarValue::Bool(*b)),
            _ => None,
        }
    }

    /// Parse user text as a number, preferring an integer like Lua does.
    pub fn parse_number(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Some(VarValue::Int(i));
        }
        text.parse::<f64>().ok().map(VarValue::Num)
    }
}

impl IntoLua for VarValue {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        Ok(match self {
            VarValue::Str(s) => LuaValue::String(lua.create_string(&s)?),
            VarValue::Int(i) => LuaValue::Integer(i),
            VarValue::Num(x) => LuaValue::Number(x),
            VarValue::Bool(b) => LuaValue::Boolean(b),
        })
    }
}

// ── String forms ──────────────────────────────────────────────────────────────

pub(crate) fn lua_str(s: &LuaString) -> String {
    s.to_string_lossy().to_string()
}

/// The string form of any Lua value, exactly as `tostring` shows it
/// (`3.0`, `1e+20`, `table: 0x...`).
pub fn display_value(value: &LuaValue) -> String {
    match value {
        LuaValue::String(s) => lua_str(s),
        other => other
            .to_string()
            .unwrap_or_else(|_| format!("{}: {:p}", other.type_name(), other.to_pointer())),
    }
}

/// A top-level scalar as the script declared it.
#[derive(Debug, Clone, PartialEq)]
pub struct Declared {
    pub name: String,
    pub value: VarValue,
    /// Lua's string form of the declared value.
    pub shown: String,
}

// ── VarStore ──────────────────────────────────────────────────────────────────

/// Typed access to the script's global namespace.
///
/// Entries are never deleted, only overwritten.
#[derive(Debug, Clone)]
pub struct VarStore {
    globals: LuaTable,
}

impl VarStore {
    pub fn new(lua: &Lua) -> Self {
        Self { globals: lua.globals() }
    }

    /// Raw value of a global (nil if absent).
    pub fn raw(&self, name: &str) -> LuaResult<LuaValue> {
        self.globals.get(name)
    }

    /// Scalar value of a global; `None` when absent or not a scalar.
    pub fn get(&self, name: &str) -> LuaResult<Option<VarValue>> {
        Ok(VarValue::from_lua_value(&self.raw(name)?))
    }

    /// Set (or overwrite) a global.
    pub fn set(&self, name: &str, value: VarValue) -> LuaResult<()> {
        self.globals.set(name, value)
    }

    /// Read a boolean setting; absent or non-boolean yields `default`.
    pub fn get_bool(&self, name: &str, default: bool) -> LuaResult<bool> {
        Ok(match self.get(name)? {
            Some(VarValue::Bool(b)) => b,
            _ => default,
        })
    }

    /// Current string form of a global, `nil` when unset.
    pub fn display(&self, name: &str) -> LuaResult<String> {
        Ok(display_value(&self.raw(name)?))
    }

    /// Every top-level scalar a user may override from the command line:
    /// names starting with `_` are internal and `help_*` entries are help
    /// text.  Sorted by name.
    pub fn declared_scalars(&self) -> LuaResult<Vec<Declared>> {
        let mut out = Vec::new();
        for pair in self.globals.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            let LuaValue::String(key) = key else { continue };
            let name = lua_str(&key);
            if name.starts_with('_') || name.starts_with("help_") {
                continue;
            }
            if let Some(v) = VarValue::from_lua_value(&value) {
                out.push(Declared { name, value: v, shown: display_value(&value) });
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
