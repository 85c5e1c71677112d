//! Abstract Syntax Tree (AST) for Viable programs
//!
//! The tree mirrors the grammar: a [`Program`] is a list of statements, every
//! statement body is an [`Expression`] (implicit concatenation of [`Rule`]s), and
//! every node records the [`Span`] of source text it was parsed from.

use std::fmt;

use crate::error::Span;
use crate::lexer::BuiltinClass;

/// Index of a binding in the resolver's symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

impl BindingId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A whole source file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    /// All `let` statements in program order
    pub fn lets(&self) -> impl Iterator<Item = &LetStatement> {
        self.statements.iter().filter_map(|statement| match statement {
            Statement::Let(let_statement) => Some(let_statement),
            Statement::Match(_) => None,
        })
    }

    /// All `match` statements in program order
    pub fn matches(&self) -> impl Iterator<Item = &MatchStatement> {
        self.statements.iter().filter_map(|statement| match statement {
            Statement::Match(match_statement) => Some(match_statement),
            Statement::Let(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `let name = expression;`
    Let(LetStatement),
    /// `match expression;`
    Match(MatchStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Let(statement) => statement.span,
            Statement::Match(statement) => statement.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetStatement {
    pub name: Ident,
    pub body: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchStatement {
    pub body: Expression,
    pub span: Span,
}

/// A name together with where it was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Ident {
            name: name.into(),
            span,
        }
    }
}

/// A sequence of rules matched one after another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub rules: Vec<Rule>,
    pub span: Span,
}

impl Expression {
    pub fn new(rules: Vec<Rule>, span: Span) -> Self {
        Expression { rules, span }
    }

    /// Wrap a single rule, as produced by an unbraced block
    pub fn single(rule: Rule) -> Self {
        let span = rule.span;
        Expression {
            rules: vec![rule],
            span,
        }
    }
}

/// A rule and its source span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub kind: RuleKind,
    pub span: Span,
}

impl Rule {
    pub fn new(kind: RuleKind, span: Span) -> Self {
        Rule { kind, span }
    }
}

/// Rule variants, one per grammar rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Positive lookahead: `ahead { ... }`
    Ahead { body: Expression },
    /// Positive lookbehind: `behind { ... }`
    Behind { body: Expression },
    /// Capture group, optionally named: `capture name { ... }`
    Capture {
        name: Option<Ident>,
        body: Expression,
    },
    /// Alternation: `either { a, b, ... }`
    Either { branches: Vec<Expression> },
    /// Negated lookaround or symbol set: `not ahead { ... }`
    Not { target: NotTarget },
    /// Repetition: `lazy? quantifier of { ... }`
    Of {
        quantifier: Quantifier,
        quantifier_span: Span,
        lazy: bool,
        body: Expression,
    },
    /// Literal text
    String { value: String, case_sensitive: bool },
    /// Pattern text written in backticks and copied through unescaped
    Raw { value: String },
    /// Character set: `symbols { a, b to z, <digit> }`
    Symbols(SymbolSet),
    /// Reference to a `let` binding, filled in by the resolver
    Variable {
        name: String,
        binding: Option<BindingId>,
    },
    /// Braced expression with no regex syntax of its own
    Group { body: Expression },
}

/// What a `not` applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotTarget {
    Ahead(Expression),
    Behind(Expression),
    Symbols(SymbolSet),
}

/// The items of a `symbols { ... }` set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolSet {
    pub items: Vec<SymbolItem>,
    pub negated: bool,
}

impl SymbolSet {
    /// A set holding one built-in class, as written with bare `<name>`
    pub fn builtin(class: BuiltinClass, span: Span) -> Self {
        SymbolSet {
            items: vec![SymbolItem::new(SymbolItemKind::Builtin(class), span)],
            negated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolItem {
    pub kind: SymbolItemKind,
    pub span: Span,
}

impl SymbolItem {
    pub fn new(kind: SymbolItemKind, span: Span) -> Self {
        SymbolItem { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolItemKind {
    Char(char),
    /// Several characters, each a member of the set
    Text(String),
    Builtin(BuiltinClass),
    /// Inclusive range: `a to z`
    To { from: char, to: char },
}

/// Repetition count as written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// `N of`
    Exact(u32),
    /// `some of`
    Some,
    /// `option of`
    Option,
    /// `any of`
    Any,
    /// `over N of`
    Over(u32),
    /// `N to M of`
    Range(u32, u32),
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::Exact(n) => write!(f, "{}", n),
            Quantifier::Some => write!(f, "some"),
            Quantifier::Option => write!(f, "option"),
            Quantifier::Any => write!(f, "any"),
            Quantifier::Over(n) => write!(f, "over {}", n),
            Quantifier::Range(n, m) => write!(f, "{} to {}", n, m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_rule(value: &str, start: usize) -> Rule {
        Rule::new(
            RuleKind::String {
                value: value.to_string(),
                case_sensitive: true,
            },
            Span::new(start, start + value.len() + 2),
        )
    }

    #[test]
    fn test_single_expression_takes_rule_span() {
        let expr = Expression::single(string_rule("abc", 6));
        assert_eq!(expr.span, Span::new(6, 11));
        assert_eq!(expr.rules.len(), 1);
    }

    #[test]
    fn test_program_filters_statements() {
        let program = Program {
            statements: vec![
                Statement::Let(LetStatement {
                    name: Ident::new("a", Span::new(4, 5)),
                    body: Expression::single(string_rule("a", 8)),
                    span: Span::new(0, 12),
                }),
                Statement::Match(MatchStatement {
                    body: Expression::single(string_rule("b", 19)),
                    span: Span::new(13, 23),
                }),
            ],
        };
        assert_eq!(program.lets().count(), 1);
        assert_eq!(program.matches().count(), 1);
        assert_eq!(program.statements[1].span(), Span::new(13, 23));
    }

    #[test]
    fn test_builtin_symbol_set() {
        let set = SymbolSet::builtin(BuiltinClass::Digit, Span::new(0, 7));
        assert!(!set.negated);
        assert_eq!(
            set.items,
            vec![SymbolItem::new(
                SymbolItemKind::Builtin(BuiltinClass::Digit),
                Span::new(0, 7)
            )]
        );
    }

    #[test]
    fn test_quantifier_display() {
        assert_eq!(Quantifier::Exact(3).to_string(), "3");
        assert_eq!(Quantifier::Over(2).to_string(), "over 2");
        assert_eq!(Quantifier::Range(1, 4).to_string(), "1 to 4");
        assert_eq!(Quantifier::Any.to_string(), "any");
    }
}
