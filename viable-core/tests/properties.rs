//! Property-based tests for the compiler
//!
//! These check laws that must hold for any input: compilation is
//! deterministic, equivalent spellings compile identically, and string
//! literals always match exactly their own text.

use proptest::prelude::*;
use viable_core::{CompileError, compile, tokenize};

/// What a compile produced, with diagnostics reduced to their errors
type Outcome = Result<(String, Vec<String>, bool), Vec<CompileError>>;

fn outcome(source: &str) -> Outcome {
    match compile(source) {
        Ok(result) => Ok((result.pattern, result.capture_names, result.uses_assertions)),
        Err(diagnostics) => Err(diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| d.error.clone())
            .collect()),
    }
}

/// Write `text` as a Viable string literal
fn quote(text: &str) -> String {
    let mut quoted = String::from("\"");
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str(r"\\"),
            '"' => quoted.push_str("\\\""),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Small rule bodies covering every precedence level
fn body() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        r#""a""#,
        r#""ab""#,
        r#""""#,
        r#"either { "a", "b" }"#,
        r#"2 of "c""#,
        r#"capture "d""#,
        "<digit>",
        "not symbols { x, y }",
        r#"some of { "x" "y" }"#,
        r#"ahead "q""#,
        "`[a-c]+`",
        r#"either { "a" "b", 3 of "c" }"#,
    ])
}

/// Surroundings a body can be placed in
fn context() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop::sample::select(vec![
        ("", ""),
        (r#""p" "#, r#" "s""#),
        ("some of ", ""),
        ("lazy 2 to 3 of ", r#" "z""#),
        ("capture ", ""),
        ("either { ", r#", "w" }"#),
        ("not ahead ", ""),
    ])
}

fn negatable_builtin() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "<digit>",
        "<word>",
        "<whitespace>",
        "<alphabetic>",
        "<alphanumeric>",
        "<newline>",
        "<tab>",
        "<space>",
        "<backspace>",
        "<boundary>",
    ])
}

proptest! {
    #[test]
    fn compile_is_deterministic(source in r#"[a-z0-9 {};,="<>]{0,40}"#) {
        let first = compile(&source);
        let second = compile(&source);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn tokenize_always_ends_with_eof(source in "\\PC{0,60}") {
        let tokens = tokenize(&source);
        prop_assert_eq!(tokens.last().map(|t| t.kind), Some(viable_core::TokenKind::Eof));
        for token in &tokens {
            prop_assert!(token.span.end <= source.len());
            prop_assert_eq!(&source[token.span.start..token.span.end], token.text);
        }
    }

    #[test]
    fn range_to_same_bound_is_exact(n in 0u32..100, body in body()) {
        let range = outcome(&format!("match {} to {} of {};", n, n, body));
        let exact = outcome(&format!("match {} of {};", n, body));
        prop_assert_eq!(range, exact);
    }

    #[test]
    fn string_literal_matches_only_itself(
        text in "[ -~]{0,20}",
        other in "[ -~]{0,20}",
    ) {
        let result = compile(&format!("match {};", quote(&text))).unwrap();
        let regex = regex::Regex::new(&format!("^(?:{})$", result.pattern)).unwrap();
        prop_assert!(regex.is_match(&text));
        if other != text {
            prop_assert!(!regex.is_match(&other));
        }
    }

    #[test]
    fn double_negation_cancels(builtin in negatable_builtin()) {
        let plain = compile(&format!("match symbols {{ {} }};", builtin)).unwrap();
        let twice = compile(&format!("match not not symbols {{ {} }};", builtin)).unwrap();
        prop_assert_eq!(plain.pattern, twice.pattern);
    }

    #[test]
    fn variable_inlines_like_a_group(body in body(), (before, after) in context()) {
        let inlined = outcome(&format!("let x = {}; match {}x{};", body, before, after));
        let grouped = outcome(&format!("match {}{{ {} }}{};", before, body, after));
        prop_assert_eq!(inlined, grouped);
    }
}
