//! `{{tag}}` template rendering against script state.
//!
//! Exposed to scripts as `t(text)`.  A render builds a fresh
//! [`TemplateScope`] from four sources, later ones winning on identical keys:
//!
//! | Source                        | Key form       | Entry                   |
//! |-------------------------------|----------------|-------------------------|
//! | process environment           | `NAME`         | literal                 |
//! | global scalars                | `name`         | literal (string form)   |
//! | global functions              | `name`         | deferred, called per use|
//! | global tables                 | `name[key]`    | literal                 |
//! | locals of the calling frame   | `name` / `name[key]` | literal           |
//!
//! Globals whose name starts with `_` are left out.  Unknown tags render as
//! empty text.

use std::collections::HashMap;

use mlua::prelude::*;

use crate::error::{Result, ShellError};
use crate::var::{display_value, lua_str};

pub const OPEN: &str = "{{";
pub const CLOSE: &str = "}}";

// ── Scope ─────────────────────────────────────────────────────────────────────

/// One resolvable template name.
#[derive(Debug, Clone)]
pub enum ScopeEntry {
    Literal(String),
    /// Called with no arguments each time the tag is substituted.
    Deferred(LuaFunction),
}

/// Name → entry mapping used for a single render.
#[derive(Debug, Clone, Default)]
pub struct TemplateScope {
    entries: HashMap<String, ScopeEntry>,
}

impl TemplateScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full scope: environment, then globals, then `locals`.
    pub fn build(lua: &Lua, locals: Option<&LuaTable>) -> LuaResult<Self> {
        let mut scope = Self::new();
        scope.add_environment();
        scope.add_globals(lua)?;
        if let Some(locals) = locals {
            scope.add_locals(locals)?;
        }
        Ok(scope)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: ScopeEntry) {
        self.entries.insert(name.into(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&ScopeEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn add_environment(&mut self) {
        for (key, value) in std::env::vars_os() {
            if let (Ok(key), Ok(value)) = (key.into_string(), value.into_string()) {
                self.insert(key, ScopeEntry::Literal(value));
            }
        }
    }

    fn add_globals(&mut self, lua: &Lua) -> LuaResult<()> {
        for pair in lua.globals().pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            let LuaValue::String(key) = key else { continue };
            let name = lua_str(&key);
            if name.starts_with('_') {
                continue;
            }
            match value {
                LuaValue::Function(f) => self.insert(name, ScopeEntry::Deferred(f)),
                LuaValue::Table(tbl) => self.add_table(&name, &tbl)?,
                LuaValue::String(_)
                | LuaValue::Integer(_)
                | LuaValue::Number(_)
                | LuaValue::Boolean(_) => {
                    self.insert(name, ScopeEntry::Literal(display_value(&value)));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn add_locals(&mut self, locals: &LuaTable) -> LuaResult<()> {
        for pair in locals.pairs::<String, LuaValue>() {
            let (name, value) = pair?;
            match value {
                LuaValue::Table(tbl) => self.add_table(&name, &tbl)?,
                other => self.insert(name, ScopeEntry::Literal(display_value(&other))),
            }
        }
        Ok(())
    }

    fn add_table(&mut self, name: &str, tbl: &LuaTable) -> LuaResult<()> {
        for pair in tbl.pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair?;
            let key = format!("{name}[{}]", display_value(&key));
            self.insert(key, ScopeEntry::Literal(display_value(&value)));
        }
        Ok(())
    }
}

// ── Template ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Tag(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Split `src` into text and tags.
    ///
    /// Fails when a `{{` is never closed, or when another `{{` appears before
    /// the closing `}}`.  A lone `}}` is ordinary text.
    pub fn parse(src: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = src;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_owned()));
            }
            let after_open = &rest[start + OPEN.len()..];
            let end = after_open.find(CLOSE).ok_or_else(|| {
                ShellError::Template(format!(
                    "cannot find end tag {CLOSE:?} in template starting at byte {start}"
                ))
            })?;
            let name = &after_open[..end];
            if name.contains(OPEN) {
                return Err(ShellError::Template(format!(
                    "unbalanced {OPEN:?} inside tag {name:?}"
                )));
            }
            segments.push(Segment::Tag(name.to_owned()));
            rest = &after_open[end + CLOSE.len()..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_owned()));
        }

        Ok(Self { segments })
    }

    /// Names of all tags, in order of appearance.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Tag(name) => Some(name.as_str()),
            Segment::Text(_) => None,
        })
    }

    /// Substitute every tag.  A failing deferred entry aborts the whole
    /// render.
    pub fn render(&self, scope: &TemplateScope) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Tag(name) => match scope.get(name) {
                    Some(ScopeEntry::Literal(value)) => out.push_str(value),
                    Some(ScopeEntry::Deferred(f)) => {
                        let value = f.call::<LuaValue>(()).map_err(|e| {
                            ShellError::Template(format!(
                                "{{{{{name}}}}}: {}",
                                crate::lua::summarize(&e)
                            ))
                        })?;
                        out.push_str(&display_value(&value));
                    }
                    None => {}
                },
            }
        }
        Ok(out)
    }
}

/// Parse and render `src` in one go.
pub fn render(src: &str, scope: &TemplateScope) -> Result<String> {
    Template::parse(src)?.render(scope)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
