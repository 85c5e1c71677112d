//! Error types and diagnostics for the Viable compiler
//!
//! Every stage of the pipeline reports problems as [`Diagnostic`]s collected
//! into a shared [`Diagnostics`] list instead of returning on the first error.
//! The error taxonomy itself is [`CompileError`], built with `thiserror` so each
//! variant carries its own message.

use std::fmt;

use thiserror::Error;

use crate::lexer::BuiltinClass;

/// Specific kinds of lexer errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexErrorKind {
    /// Encountered a character that starts no token
    #[error("unexpected character")]
    UnexpectedChar,

    /// String literal without a closing delimiter
    #[error("unterminated string literal")]
    UnterminatedString,

    /// Raw literal without a closing backtick
    #[error("unterminated raw literal")]
    UnterminatedRaw,

    /// Unknown escape inside a string literal
    #[error("invalid escape sequence in string literal")]
    InvalidEscape,

    /// `/*` without a matching `*/`
    #[error("unterminated block comment")]
    UnterminatedComment,

    /// `<name>` that is not a built-in class, or a `<` that is never closed
    #[error("unknown character class")]
    UnknownClass,
}

/// The error taxonomy shared by all compiler stages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Unrecognized input in the source text
    #[error("{kind} `{text}`")]
    LexError {
        /// The specific kind of lexer error
        kind: LexErrorKind,
        /// The offending source text
        text: String,
    },

    /// The parser found a token it cannot use at this position
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected
        expected: String,
        /// What was actually found
        found: String,
    },

    /// A `{` that is never closed
    #[error("unterminated block, missing closing `}}`")]
    UnterminatedBlock,

    /// An `either` branch with no rules in it
    #[error("empty branch in `either`")]
    EmptyAlternationBranch,

    /// A quantifier followed by `of` but nothing to repeat
    #[error("quantifier is missing its `of` body")]
    MissingQuantifierBody,

    /// A number literal that does not fit a repetition count
    #[error("number `{0}` is too large")]
    InvalidNumber(String),

    /// Reference to a name no earlier `let` declares
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    /// A second `let` for an already bound name
    #[error("variable `{0}` is already defined")]
    DuplicateBinding(String),

    /// A `let` body that refers to its own binding
    #[error("variable `{0}` refers to itself")]
    CircularBinding(String),

    /// A `let` whose name is never referenced
    #[error("variable `{0}` is never used")]
    UnusedBinding(String),

    /// A quantifier range whose lower bound exceeds its upper bound
    #[error("invalid range: {min} is greater than {max}")]
    InvalidRange {
        /// Lower bound as written
        min: u32,
        /// Upper bound as written
        max: u32,
    },

    /// A character range whose start comes after its end
    #[error("invalid character range: `{from}` comes after `{to}`")]
    InvalidCharRange {
        /// First character of the range
        from: char,
        /// Last character of the range
        to: char,
    },

    /// A quantifier that can only ever match zero times
    #[error("zero-width quantifier, the body is never matched")]
    ZeroWidthQuantifier,

    /// A quantifier whose body is a lone lookaround or anchor
    #[error("an assertion cannot be repeated")]
    QuantifiedAssertion,

    /// `symbols {}`
    #[error("symbol set has no items")]
    EmptySymbolSet,

    /// An anchor or `<char>` mixed with other items in one symbol set
    #[error("`{0}` cannot be combined with other symbols")]
    AnchorInSymbolSet(BuiltinClass),

    /// `not` applied to a class with no negated form
    #[error("`{0}` cannot be negated")]
    NegatedAnchor(BuiltinClass),

    /// The same capture name used twice in the final pattern
    #[error("capture name `{0}` is used more than once")]
    DuplicateCaptureName(String),

    /// More than one `match` statement in a program
    #[error("only one `match` statement is allowed")]
    MultipleMatchStatements,

    /// A program without any `match` statement
    #[error("no `match` statement, nothing to compile")]
    MissingMatchStatement,
}

impl CompileError {
    /// Default severity for this kind of error
    pub fn severity(&self) -> Severity {
        match self {
            CompileError::UnusedBinding(_) | CompileError::ZeroWidthQuantifier => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A span representing a location in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a zero-width span at a position
    pub fn empty(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos,
        }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A secondary location attached to a diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Related {
    pub span: Span,
    pub message: String,
}

/// An error or warning with its source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: CompileError,
    pub span: Span,
    pub related: Vec<Related>,
}

impl Diagnostic {
    /// Create a diagnostic using the error's default severity
    pub fn new(error: CompileError, span: Span) -> Self {
        Diagnostic {
            severity: error.severity(),
            error,
            span,
            related: Vec::new(),
        }
    }

    /// Attach a secondary location
    pub fn with_related(mut self, message: impl Into<String>, span: Span) -> Self {
        self.related.push(Related {
            span,
            message: message.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.span, self.error)?;
        for related in &self.related {
            write!(f, " ({} at {})", related.message, related.span)?;
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics from every compiler stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics(Vec::new())
    }

    /// Record a diagnostic with the error's default severity
    pub fn report(&mut self, error: CompileError, span: Span) {
        self.0.push(Diagnostic::new(error, span));
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.0.iter().any(Diagnostic::is_warning)
    }

    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_warning()).count()
    }

    /// Whether any diagnostic has the given error
    pub fn contains(&self, error: &CompileError) -> bool {
        self.0.iter().any(|d| &d.error == error)
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }

    fn summary(&self) -> String {
        let errors = self.error_count();
        let warnings = self.warning_count();
        let plural = |n: usize, word: &str| {
            if n == 1 {
                format!("{n} {word}")
            } else {
                format!("{n} {word}s")
            }
        };
        match (errors, warnings) {
            (0, 0) => "no diagnostics".to_string(),
            (e, 0) => plural(e, "error"),
            (0, w) => plural(w, "warning"),
            (e, w) => format!("{}, {}", plural(e, "error"), plural(w, "warning")),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

impl std::error::Error for Diagnostics {}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Result type alias for compiler stages
pub type Result<T> = std::result::Result<T, Diagnostics>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_display() {
        let err = CompileError::LexError {
            kind: LexErrorKind::UnexpectedChar,
            text: "#".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected character `#`");
    }

    #[test]
    fn test_unexpected_token_display() {
        let err = CompileError::UnexpectedToken {
            expected: "`of`".to_string(),
            found: "`;`".to_string(),
        };
        assert_eq!(err.to_string(), "expected `of`, found `;`");
    }

    #[test]
    fn test_unterminated_block_display() {
        assert_eq!(
            CompileError::UnterminatedBlock.to_string(),
            "unterminated block, missing closing `}`"
        );
    }

    #[test]
    fn test_default_severity() {
        assert_eq!(
            CompileError::UnusedBinding("x".into()).severity(),
            Severity::Warning
        );
        assert_eq!(CompileError::ZeroWidthQuantifier.severity(), Severity::Warning);
        assert_eq!(
            CompileError::MissingMatchStatement.severity(),
            Severity::Error
        );
    }

    #[test]
    fn test_span_helpers() {
        let span = Span::new(10, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(Span::empty(3).is_empty());
        assert_eq!(Span::new(4, 6).to(Span::new(1, 5)), Span::new(1, 6));
    }

    #[test]
    fn test_diagnostics_counts() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(CompileError::UnusedBinding("x".into()), Span::new(0, 1));
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.has_warnings());

        diagnostics.report(CompileError::EmptySymbolSet, Span::new(2, 4));
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 1);
        assert!(diagnostics.contains(&CompileError::EmptySymbolSet));
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(diagnostics.to_string(), "no diagnostics");

        diagnostics.report(CompileError::EmptySymbolSet, Span::new(0, 1));
        assert_eq!(diagnostics.to_string(), "1 error");

        diagnostics.report(CompileError::MissingMatchStatement, Span::new(0, 1));
        diagnostics.report(CompileError::ZeroWidthQuantifier, Span::new(0, 1));
        assert_eq!(diagnostics.to_string(), "2 errors, 1 warning");
    }

    #[test]
    fn test_diagnostic_display_with_related() {
        let diagnostic = Diagnostic::new(
            CompileError::DuplicateBinding("digits".into()),
            Span::new(20, 26),
        )
        .with_related("first defined here", Span::new(4, 10));
        assert_eq!(
            diagnostic.to_string(),
            "error at 20..26: variable `digits` is already defined (first defined here at 4..10)"
        );
    }
}
