//! End-to-end tests for the compiler
//!
//! These tests run whole programs through `compile` and check the generated
//! pattern, or the diagnostics when compilation fails.

use viable_core::{BuiltinClass, CompileError, Lexer, Span, compile, compile_debug, parse};

fn pattern(source: &str) -> String {
    match compile(source) {
        Ok(result) => result.pattern,
        Err(diagnostics) => panic!("{} failed: {:?}", source, diagnostics),
    }
}

fn errors(source: &str) -> Vec<CompileError> {
    compile(source)
        .unwrap_err()
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.error.clone())
        .collect()
}

#[test]
fn test_full_pipeline() {
    let source = r#"
        // a date like 2024-01-31
        let digitPair = 2 of <digit>;
        match <start>
            capture year { 4 of <digit> } "-"
            capture month digitPair "-"
            capture day digitPair
            <end>;
    "#;

    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    assert!(!tokens.is_empty());

    let program = parse(source).unwrap();
    assert_eq!(program.statements.len(), 2);

    let result = compile(source).unwrap();
    assert_eq!(
        result.pattern,
        r"^(?<year>\d{4})\-(?<month>\d{2})\-(?<day>\d{2})$"
    );
    assert_eq!(result.capture_names, vec!["year", "month", "day"]);
    assert!(result.uses_assertions);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_quantifiers() {
    let test_cases = vec![
        (r#"match 5 of "A";"#, "A{5}"),
        (r#"match 1 to 5 of "A";"#, "A{1,5}"),
        (r#"match 2 to 2 of "A";"#, "A{2}"),
        (r#"match over 4 of "a";"#, "a{4,}"),
        (r#"match some of <char>;"#, ".+"),
        (r#"match some of "ABC";"#, "(?:ABC)+"),
        (r#"match any of "a";"#, "a*"),
        (r#"match option of "a";"#, "a?"),
        (r#"match 3 of <char>;"#, ".{3}"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(pattern(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_lazy_quantifiers() {
    let source = r#"
        match
            lazy any of "A"
            lazy some of "A"
            lazy over 3 of "A"
            lazy option of "A"
            lazy 2 to 4 of "A"
            lazy 5 of "A";
    "#;
    assert_eq!(pattern(source), "A*?A+?A{3,}?A??A{2,4}?A{5}?");
}

#[test]
fn test_captures() {
    let test_cases = vec![
        (
            r#"match capture { 5 of "A"; symbols { 0 to 9 } };"#,
            "(A{5}[0-9])",
        ),
        (
            r#"match capture name { 5 of "A"; symbols { 0 to 9 } };"#,
            "(?<name>A{5}[0-9])",
        ),
        (r#"match capture "a" either { "b", "c" };"#, "(a)(?:b|c)"),
        (
            r#"match capture outer { capture inner "a" };"#,
            "(?<outer>(?<inner>a))",
        ),
    ];

    for (input, expected) in test_cases {
        assert_eq!(pattern(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_every_builtin() {
    let source = r#"
        match
            <start>
            <char>
            <whitespace> not <whitespace>
            <newline> not <newline>
            <tab> not <tab>
            <return> not <return>
            <feed> not <feed>
            <null> not <null>
            <digit> not <digit>
            <word> not <word>
            <vertical> not <vertical>
            <alphabetic> not <alphabetic>
            <alphanumeric> not <alphanumeric>
            <space> not <space>
            <boundary> not <boundary>
            <backspace> not <backspace>
            <end>;
    "#;
    assert_eq!(
        pattern(source),
        r"^.\s\S\n[^\n]\t[^\t]\r[^\r]\f[^\f]\0[^\0]\d\D\w\W\v[^\v][a-zA-Z][^a-zA-Z][a-zA-Z0-9][^a-zA-Z0-9] [^ ]\b\B[\b][^\b]$"
    );
}

#[test]
fn test_symbol_ranges() {
    let test_cases = vec![
        ("match symbols { A to Z } 7 of symbols { A to Z };", "[A-Z][A-Z]{7}"),
        ("match not symbols { 3 to 5 } not symbols { a to z };", "[^3-5][^a-z]"),
        ("match symbols { a to f, 0 to 9, <space> };", "[a-f0-9 ]"),
        (r#"match symbols { "+", "-", "." };"#, r"[+\-.]"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(pattern(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_lookarounds() {
    let test_cases = vec![
        (r#"match ahead { "a" } "b";"#, "(?=a)b"),
        (r#"match behind "a" "b";"#, "(?<=a)b"),
        (r#"match "b" not ahead { "a" };"#, "b(?!a)"),
        (r#"match not behind either { "a", "b" } "c";"#, "(?<!a|b)c"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(pattern(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_comments() {
    let source = r#"/* a single digit in the range of 0 to 5 */
        // other comment
        match symbols { 0 to 5 } { "x"; };
    "#;
    assert_eq!(pattern(source), "[0-5]x");
}

#[test]
fn test_quantified_group() {
    let source = r#"
        match 3 of {
            5 of "A";
            symbols { 0 to 9 };
        };
    "#;
    assert_eq!(pattern(source), "(?:A{5}[0-9]){3}");
}

#[test]
fn test_escaping() {
    assert_eq!(pattern(r#"match "1+1=2?";"#), r"1\+1=2\?");
    assert_eq!(pattern(r#"match "(a|b)";"#), r"\(a\|b\)");
    assert_eq!(pattern(r#"match "\\d";"#), r"\\d");
    assert_eq!(pattern(r#"match 'it\'s';"#), "it's");
}

#[test]
fn test_raw_literals() {
    let test_cases = vec![
        (r"match 5 of `.*\``;", "(?:.*`){5}"),
        (r"match `(a|b)` 'c';", "(a|b)c"),
        (r"match either { `\d+`, `\w` };", r"\d+|\w"),
        ("match capture raw `[^,]*`;", "(?<raw>[^,]*)"),
    ];

    for (input, expected) in test_cases {
        assert_eq!(pattern(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_quantified_assertions() {
    let test_cases = vec![
        r#"match 2 of not behind "a";"#,
        r#"match some of ahead "a";"#,
        "match some of <start>;",
        "match 3 of <boundary>;",
    ];

    for input in test_cases {
        assert_eq!(
            errors(input),
            vec![CompileError::QuantifiedAssertion],
            "Failed for input: {}",
            input
        );
    }
}

#[test]
fn test_variables() {
    assert_eq!(
        pattern("let digitPair = 2 of symbols { <digit> }; match digitPair;"),
        r"\d{2}"
    );
    assert_eq!(
        pattern(r#"let x = "a"; let y = x; match y;"#),
        pattern(r#"match "a";"#)
    );
    assert_eq!(
        pattern(r#"let sep = either { "-", "/" }; match <digit> sep <digit>;"#),
        r"\d(?:\-|/)\d"
    );
}

#[test]
fn test_multiple_match_statements() {
    let diagnostics = compile(r#"match capture "x"; match capture "x";"#).unwrap_err();
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics.as_slice()[0];
    assert_eq!(diagnostic.error, CompileError::MultipleMatchStatements);
    assert_eq!(diagnostic.span, Span::new(19, 37));
}

#[test]
fn test_undefined_variable_span() {
    let diagnostics = compile("match variable missing;").unwrap_err();
    let diagnostic = &diagnostics.as_slice()[0];
    assert_eq!(
        diagnostic.error,
        CompileError::UndefinedVariable("missing".to_string())
    );
    assert_eq!(diagnostic.span, Span::new(6, 22));
}

#[test]
fn test_invalid_range() {
    assert_eq!(
        errors(r#"match 3 to 1 of "a";"#),
        vec![CompileError::InvalidRange { min: 3, max: 1 }]
    );
}

#[test]
fn test_codegen_errors() {
    let test_cases = vec![
        ("match symbols {};", CompileError::EmptySymbolSet),
        (
            "match symbols { <start>, a };",
            CompileError::AnchorInSymbolSet(BuiltinClass::Start),
        ),
        ("match not <char>;", CompileError::NegatedAnchor(BuiltinClass::Char)),
        (
            "match symbols { 9 to 0 };",
            CompileError::InvalidCharRange { from: '9', to: '0' },
        ),
        (
            r#"let c = capture n "a"; match c c;"#,
            CompileError::DuplicateCaptureName("n".to_string()),
        ),
        (r#"let a = "a";"#, CompileError::MissingMatchStatement),
    ];

    for (input, expected) in test_cases {
        assert_eq!(errors(input), vec![expected], "Failed for input: {}", input);
    }
}

#[test]
fn test_all_parse_errors_reported() {
    let source = r#"
        let a = 2 "x";
        let b = either { , "y" };
        let c = some of;
        match a b c #;
    "#;
    let diagnostics = compile(source).unwrap_err();
    assert_eq!(diagnostics.error_count(), 4);
}

#[test]
fn test_compile_debug_report() {
    let report = compile_debug(r#"match capture n "a";"#).unwrap();
    assert_eq!(report.result.pattern, "(?<n>a)");
    assert_eq!(report.token_count, 6);

    let text = report.to_string();
    assert!(text.starts_with("Compilation Report"));
    assert!(text.contains("Captures: n"));
}
