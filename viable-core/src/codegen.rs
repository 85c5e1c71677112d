//! Regex code generation
//!
//! Rules are emitted bottom-up as [`Fragment`]s. Each fragment remembers how
//! tightly it binds ([`Precedence`]), and a parent only wraps a child in
//! `(?:...)` when the child would otherwise bind too loosely: quantifying
//! anything that is not a single atom, or concatenating an alternation.

use std::fmt;

use log::{debug, trace};

use crate::ast::{Expression, NotTarget, Rule, RuleKind, SymbolItemKind, SymbolSet};
use crate::error::{CompileError, Diagnostic, Diagnostics, Result, Span};
use crate::groups::GroupRegistry;
use crate::lexer::BuiltinClass;
use crate::quantifier::normalize;
use crate::resolver::{ResolvedProgram, SymbolTable};

/// How tightly a fragment binds, from tightest to loosest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// Matches the empty string and has no text
    Empty,
    /// A single unit a quantifier can apply to: `a`, `\d`, `[abc]`, `(...)`
    Atom,
    /// Concatenated or quantified units: `abc`, `a{2}`
    Sequence,
    /// `a|b`
    Alternation,
}

/// A capture group as it appears in a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSite {
    pub name: Option<String>,
    pub span: Span,
}

/// A piece of generated regex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub precedence: Precedence,
    /// Capture groups inside this fragment, in order of their opening paren
    pub captures: Vec<CaptureSite>,
    /// Whether the fragment contains a lookaround or anchor
    pub uses_assertions: bool,
    /// The fragment is exactly one lookaround or anchor
    pub is_assertion: bool,
}

impl Fragment {
    pub fn empty() -> Self {
        Fragment::new(String::new(), Precedence::Empty)
    }

    pub fn atom(text: impl Into<String>) -> Self {
        Fragment::new(text.into(), Precedence::Atom)
    }

    fn new(text: String, precedence: Precedence) -> Self {
        Fragment {
            text,
            precedence,
            captures: Vec::new(),
            uses_assertions: false,
            is_assertion: false,
        }
    }

    fn assertion(mut self) -> Self {
        self.uses_assertions = true;
        self.is_assertion = true;
        self
    }

    /// Wrap in a non-capturing group
    fn grouped(self) -> Self {
        Fragment {
            text: format!("(?:{})", self.text),
            precedence: Precedence::Atom,
            is_assertion: false,
            ..self
        }
    }

    /// Make the fragment safe to quantify
    fn into_atom(self) -> Self {
        if self.precedence == Precedence::Atom {
            self
        } else {
            self.grouped()
        }
    }

    /// Concatenate fragments, grouping alternations so they stay intact
    pub fn concat(parts: Vec<Fragment>) -> Self {
        let mut parts: Vec<Fragment> = parts
            .into_iter()
            .filter(|part| part.precedence != Precedence::Empty)
            .collect();

        if parts.len() <= 1 {
            return parts.pop().unwrap_or_else(Fragment::empty);
        }

        let mut result = Fragment::new(String::new(), Precedence::Sequence);
        for part in parts {
            let part = if part.precedence == Precedence::Alternation {
                part.grouped()
            } else {
                part
            };
            result.text.push_str(&part.text);
            result.captures.extend(part.captures);
            result.uses_assertions |= part.uses_assertions;
        }
        result
    }

    /// Join fragments as alternatives
    pub fn alternate(branches: Vec<Fragment>) -> Self {
        let mut branches = branches;
        if branches.len() <= 1 {
            return branches.pop().unwrap_or_else(Fragment::empty);
        }

        let mut result = Fragment::new(String::new(), Precedence::Alternation);
        for (i, branch) in branches.into_iter().enumerate() {
            if i > 0 {
                result.text.push('|');
            }
            result.text.push_str(&branch.text);
            result.captures.extend(branch.captures);
            result.uses_assertions |= branch.uses_assertions;
        }
        result
    }
}

/// The compiled output of a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexPattern {
    pub pattern: String,
    /// Unique capture names in order of appearance
    pub capture_names: Vec<String>,
    /// Whether the pattern contains lookarounds or anchors
    pub uses_assertions: bool,
    pub warnings: Diagnostics,
}

impl RegexPattern {
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for RegexPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Regex metacharacters escaped in literal text
const LITERAL_META: &[char] = &[
    '\\', '^', '$', '.', '|', '?', '*', '+', '(', ')', '[', ']', '{', '}', '-',
];

/// Characters escaped inside a bracket class
const CLASS_META: &[char] = &['\\', ']', '[', '^', '-'];

/// Escape text so it matches literally
pub fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if LITERAL_META.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_class_char(text: &mut String, c: char) {
    if CLASS_META.contains(&c) {
        text.push('\\');
    }
    text.push(c);
}

/// Spelling of a built-in class on its own
fn standalone(class: BuiltinClass) -> &'static str {
    match class {
        BuiltinClass::Digit => r"\d",
        BuiltinClass::Word => r"\w",
        BuiltinClass::Whitespace => r"\s",
        BuiltinClass::Alphabetic => "[a-zA-Z]",
        BuiltinClass::Alphanumeric => "[a-zA-Z0-9]",
        BuiltinClass::Newline => r"\n",
        BuiltinClass::Tab => r"\t",
        BuiltinClass::Return => r"\r",
        BuiltinClass::Feed => r"\f",
        BuiltinClass::Null => r"\0",
        BuiltinClass::Vertical => r"\v",
        BuiltinClass::Space => " ",
        BuiltinClass::Backspace => r"[\b]",
        BuiltinClass::Boundary => r"\b",
        BuiltinClass::Start => "^",
        BuiltinClass::End => "$",
        BuiltinClass::Char => ".",
    }
}

/// Spelling of a negated built-in class, if it has one
fn negated(class: BuiltinClass) -> Option<&'static str> {
    match class {
        BuiltinClass::Digit => Some(r"\D"),
        BuiltinClass::Word => Some(r"\W"),
        BuiltinClass::Whitespace => Some(r"\S"),
        BuiltinClass::Alphabetic => Some("[^a-zA-Z]"),
        BuiltinClass::Alphanumeric => Some("[^a-zA-Z0-9]"),
        BuiltinClass::Newline => Some(r"[^\n]"),
        BuiltinClass::Tab => Some(r"[^\t]"),
        BuiltinClass::Return => Some(r"[^\r]"),
        BuiltinClass::Feed => Some(r"[^\f]"),
        BuiltinClass::Null => Some(r"[^\0]"),
        BuiltinClass::Vertical => Some(r"[^\v]"),
        BuiltinClass::Space => Some("[^ ]"),
        BuiltinClass::Backspace => Some(r"[^\b]"),
        BuiltinClass::Boundary => Some(r"\B"),
        BuiltinClass::Start | BuiltinClass::End | BuiltinClass::Char => None,
    }
}

/// Spelling of a built-in class inside brackets, if it may appear there
fn in_class(class: BuiltinClass) -> Option<&'static str> {
    match class {
        BuiltinClass::Digit => Some(r"\d"),
        BuiltinClass::Word => Some(r"\w"),
        BuiltinClass::Whitespace => Some(r"\s"),
        BuiltinClass::Alphabetic => Some("a-zA-Z"),
        BuiltinClass::Alphanumeric => Some("a-zA-Z0-9"),
        BuiltinClass::Newline => Some(r"\n"),
        BuiltinClass::Tab => Some(r"\t"),
        BuiltinClass::Return => Some(r"\r"),
        BuiltinClass::Feed => Some(r"\f"),
        BuiltinClass::Null => Some(r"\0"),
        BuiltinClass::Vertical => Some(r"\v"),
        BuiltinClass::Space => Some(" "),
        BuiltinClass::Backspace => Some(r"\b"),
        BuiltinClass::Boundary | BuiltinClass::Start | BuiltinClass::End | BuiltinClass::Char => {
            None
        }
    }
}

struct Generator<'p> {
    symbols: &'p SymbolTable,
    /// Generated binding bodies by binding index; `None` if generation failed
    bindings: Vec<Option<Fragment>>,
    diagnostics: Diagnostics,
}

impl<'p> Generator<'p> {
    fn new(symbols: &'p SymbolTable, diagnostics: Diagnostics) -> Self {
        Generator {
            symbols,
            bindings: Vec::with_capacity(symbols.len()),
            diagnostics,
        }
    }

    /// Generate every binding once, in declaration order
    fn generate_bindings(&mut self) {
        for (id, binding) in self.symbols.iter() {
            let fragment = self.expression(&binding.body);
            trace!(
                "binding `{}` ({:?}) generated as {:?}",
                binding.name,
                id,
                fragment.as_ref().map(|f| f.text.as_str())
            );
            self.bindings.push(fragment);
        }
    }

    fn expression(&mut self, expression: &Expression) -> Option<Fragment> {
        let mut parts = Vec::with_capacity(expression.rules.len());
        let mut failed = false;
        for rule in &expression.rules {
            match self.rule(rule) {
                Some(fragment) => parts.push(fragment),
                None => failed = true,
            }
        }

        if failed {
            None
        } else {
            Some(Fragment::concat(parts))
        }
    }

    fn rule(&mut self, rule: &Rule) -> Option<Fragment> {
        match &rule.kind {
            RuleKind::String {
                value,
                case_sensitive,
            } => Some(Self::string(value, *case_sensitive)),
            RuleKind::Raw { value } if value.is_empty() => Some(Fragment::empty()),
            RuleKind::Raw { value } => Some(Fragment::new(value.clone(), Precedence::Sequence)),
            RuleKind::Symbols(set) => self.symbol_set(set, set.negated, rule.span),
            RuleKind::Ahead { body } => self.lookaround("(?=", body),
            RuleKind::Behind { body } => self.lookaround("(?<=", body),
            RuleKind::Not { target } => match target {
                NotTarget::Ahead(body) => self.lookaround("(?!", body),
                NotTarget::Behind(body) => self.lookaround("(?<!", body),
                NotTarget::Symbols(set) => self.symbol_set(set, !set.negated, rule.span),
            },
            RuleKind::Capture { name, body } => {
                let inner = self.expression(body)?;
                let text = match name {
                    Some(name) => format!("(?<{}>{})", name.name, inner.text),
                    None => format!("({})", inner.text),
                };
                let site = CaptureSite {
                    name: name.as_ref().map(|name| name.name.clone()),
                    span: name.as_ref().map_or(rule.span, |name| name.span),
                };
                let mut captures = vec![site];
                captures.extend(inner.captures);
                Some(Fragment {
                    text,
                    precedence: Precedence::Atom,
                    captures,
                    uses_assertions: inner.uses_assertions,
                    is_assertion: false,
                })
            }
            RuleKind::Either { branches } => {
                let mut fragments = Vec::with_capacity(branches.len());
                let mut failed = false;
                for branch in branches {
                    match self.expression(branch) {
                        Some(fragment) => fragments.push(fragment),
                        None => failed = true,
                    }
                }
                if failed {
                    None
                } else {
                    Some(Fragment::alternate(fragments))
                }
            }
            RuleKind::Of {
                quantifier,
                quantifier_span,
                lazy,
                body,
            } => {
                let body = self.expression(body);
                let quantity = match normalize(*quantifier, *lazy) {
                    Ok(quantity) => quantity,
                    Err(error) => {
                        self.diagnostics.report(error, *quantifier_span);
                        return None;
                    }
                };
                let body = body?;
                if body.is_assertion {
                    self.diagnostics
                        .report(CompileError::QuantifiedAssertion, rule.span);
                    return None;
                }
                let body = body.into_atom();
                Some(Fragment {
                    text: format!("{}{}", body.text, quantity.to_regex_string()),
                    precedence: Precedence::Sequence,
                    ..body
                })
            }
            RuleKind::Variable { name, binding } => {
                let Some(id) = binding else {
                    self.diagnostics
                        .report(CompileError::UndefinedVariable(name.clone()), rule.span);
                    return None;
                };
                // a failed binding has already reported its own errors
                let mut fragment = self.bindings.get(id.index()).cloned().flatten()?;
                for capture in &mut fragment.captures {
                    capture.span = rule.span;
                }
                Some(fragment)
            }
            RuleKind::Group { body } => self.expression(body),
        }
    }

    fn string(value: &str, case_sensitive: bool) -> Fragment {
        let text = escape_literal(value);
        let precedence = match value.chars().count() {
            0 => return Fragment::empty(),
            1 => Precedence::Atom,
            _ => Precedence::Sequence,
        };
        if case_sensitive {
            Fragment::new(text, precedence)
        } else {
            Fragment::atom(format!("(?i:{})", text))
        }
    }

    fn lookaround(&mut self, open: &str, body: &Expression) -> Option<Fragment> {
        let inner = self.expression(body)?;
        Some(Fragment {
            text: format!("{}{})", open, inner.text),
            precedence: Precedence::Atom,
            captures: inner.captures,
            uses_assertions: true,
            is_assertion: true,
        })
    }

    fn symbol_set(&mut self, set: &SymbolSet, negate: bool, span: Span) -> Option<Fragment> {
        if set.items.is_empty() {
            self.diagnostics.report(CompileError::EmptySymbolSet, span);
            return None;
        }

        if let [item] = set.items.as_slice() {
            if let SymbolItemKind::Builtin(class) = item.kind {
                return self.builtin(class, negate, span);
            }
        }

        let mut text = String::from("[");
        if negate {
            text.push('^');
        }
        let mut failed = false;

        for item in &set.items {
            match &item.kind {
                SymbolItemKind::Char(c) => push_class_char(&mut text, *c),
                SymbolItemKind::Text(chars) => {
                    for c in chars.chars() {
                        push_class_char(&mut text, c);
                    }
                }
                SymbolItemKind::To { from, to } => {
                    if from > to {
                        self.diagnostics.report(
                            CompileError::InvalidCharRange {
                                from: *from,
                                to: *to,
                            },
                            item.span,
                        );
                        failed = true;
                    } else {
                        push_class_char(&mut text, *from);
                        text.push('-');
                        push_class_char(&mut text, *to);
                    }
                }
                SymbolItemKind::Builtin(class) => match in_class(*class) {
                    Some(spelling) => text.push_str(spelling),
                    None => {
                        self.diagnostics
                            .report(CompileError::AnchorInSymbolSet(*class), item.span);
                        failed = true;
                    }
                },
            }
        }
        text.push(']');

        if failed { None } else { Some(Fragment::atom(text)) }
    }

    fn builtin(&mut self, class: BuiltinClass, negate: bool, span: Span) -> Option<Fragment> {
        let text = if negate {
            match negated(class) {
                Some(text) => text,
                None => {
                    self.diagnostics
                        .report(CompileError::NegatedAnchor(class), span);
                    return None;
                }
            }
        } else {
            standalone(class)
        };

        let fragment = Fragment::atom(text);
        if class.is_anchor() {
            Some(fragment.assertion())
        } else {
            Some(fragment)
        }
    }
}

/// Generate the regex pattern for a resolved program
pub fn generate(program: ResolvedProgram) -> Result<RegexPattern> {
    let ResolvedProgram {
        symbols,
        matches,
        warnings,
    } = program;

    let mut generator = Generator::new(&symbols, warnings);
    generator.generate_bindings();

    let mut matches = matches.into_iter();
    let Some(entry) = matches.next() else {
        generator
            .diagnostics
            .report(CompileError::MissingMatchStatement, Span::default());
        return Err(generator.diagnostics);
    };
    for extra in matches {
        generator.diagnostics.push(
            Diagnostic::new(CompileError::MultipleMatchStatements, extra.span)
                .with_related("first `match` is here", entry.span),
        );
    }

    let fragment = generator.expression(&entry.body);
    let mut diagnostics = generator.diagnostics;

    let Some(fragment) = fragment else {
        return Err(diagnostics);
    };

    let mut registry = GroupRegistry::new();
    for capture in fragment.captures {
        if let Err(diagnostic) = registry.register_group(capture.name, capture.span) {
            diagnostics.push(diagnostic);
        }
    }

    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    debug!(
        "generated pattern of {} bytes with {} capture groups",
        fragment.text.len(),
        registry.group_count()
    );
    Ok(RegexPattern {
        pattern: fragment.text,
        capture_names: registry.names(),
        uses_assertions: fragment.uses_assertions,
        warnings: diagnostics,
    })
}
