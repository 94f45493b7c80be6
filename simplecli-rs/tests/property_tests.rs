use proptest::prelude::*;
use simplecli::primitives::resolve_path;
use simplecli::shell::tokenize;
use simplecli::template::{render, ScopeEntry, TemplateScope};
use simplecli::{CallingConvention, CommandRegistry, LuaEngine, Output};

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,8}"
}

proptest! {
    /// `.` leaves an already-resolved directory alone.
    #[test]
    fn dot_is_identity(parts in prop::collection::vec(segment(), 0..6)) {
        let dir = resolve_path("/", &parts.join("/"));
        prop_assert_eq!(resolve_path(&dir, "."), dir.clone());
    }

    /// `..` drops exactly the last segment and never climbs above `/`.
    #[test]
    fn dotdot_pops_one_segment(parts in prop::collection::vec(segment(), 0..6)) {
        let dir = resolve_path("/", &parts.join("/"));
        let parent = resolve_path(&dir, "..");
        let expected = if parts.len() <= 1 {
            "/".to_owned()
        } else {
            format!("/{}/", parts[..parts.len() - 1].join("/"))
        };
        prop_assert_eq!(parent, expected);
    }

    /// Relative results are always wrapped in single slashes.
    #[test]
    fn relative_results_are_slash_wrapped(
        start in prop::collection::vec(segment(), 0..4),
        rel in prop::collection::vec(
            prop_oneof![
                segment(),
                Just(".".to_owned()),
                Just("..".to_owned()),
                Just(String::new()),
            ],
            1..6,
        ),
    ) {
        let dir = resolve_path("/", &start.join("/"));
        let out = resolve_path(&dir, &rel.join("/"));
        prop_assert!(out.starts_with('/'));
        prop_assert!(out.ends_with('/'));
        prop_assert!(!out.contains("//"), "{}", out);
    }

    /// Quoting words then splitting them gives the words back.
    #[test]
    fn tokenize_inverts_quoting(words in prop::collection::vec("[a-zA-Z0-9 '\"$.*-]{1,10}", 1..6)) {
        let line = shlex::try_join(words.iter().map(String::as_str)).unwrap();
        prop_assert_eq!(tokenize(&line).unwrap(), words);
    }

    /// Text without markers renders as itself.
    #[test]
    fn plain_text_renders_verbatim(text in "[^{}]{0,64}") {
        let scope = TemplateScope::new();
        prop_assert_eq!(render(&text, &scope).unwrap(), text);
    }

    /// Rendering arbitrary text returns Ok or Err but never panics.
    #[test]
    fn render_never_panics(text in ".{0,64}") {
        let mut scope = TemplateScope::new();
        scope.insert("x", ScopeEntry::Literal("value".into()));
        let _ = render(&text, &scope);
    }

    /// Known tags are replaced wherever they appear.
    #[test]
    fn known_tag_substituted(prefix in "[a-z ]{0,10}", suffix in "[a-z ]{0,10}", value in "[a-z0-9]{0,10}") {
        let mut scope = TemplateScope::new();
        scope.insert("name", ScopeEntry::Literal(value.clone()));
        let out = render(&format!("{prefix}{{{{name}}}}{suffix}"), &scope).unwrap();
        prop_assert_eq!(out, format!("{prefix}{value}{suffix}"));
    }

    /// `help` lists commands in sorted order whatever order they were defined in.
    #[test]
    fn registry_names_sorted(names in prop::collection::hash_set("[a-z]{1,6}", 1..8)) {
        let engine = LuaEngine::new(Output::capture()).unwrap();
        for name in &names {
            engine.exec(&format!("function do_{name}(args) end")).unwrap();
        }
        let registry = CommandRegistry::discover(&engine, CallingConvention::ArgsOnly).unwrap();
        let listed = registry.names();
        let mut expected: Vec<&str> = names.iter().map(String::as_str).collect();
        expected.sort_unstable();
        prop_assert_eq!(listed, expected);
    }
}
