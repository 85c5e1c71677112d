//! Viable Core Library
//!
//! A compiler from the Viable pattern language to regular expressions.
//!
//! ```
//! let pattern = viable_core::compile(
//!     r#"
//!     let digitPair = 2 of <digit>;
//!     match capture year { digitPair; digitPair } "-" digitPair;
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(pattern.pattern, r"(?<year>\d{2}\d{2})\-\d{2}");
//! ```

pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod error;
pub mod groups;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod quantifier;
pub mod resolver;

pub use ast::{BindingId, Expression, Program, Rule, RuleKind, Statement};
pub use codegen::{Fragment, Precedence, RegexPattern, escape_literal, generate};
pub use compiler::{CompileReport, compile, compile_debug};
pub use error::{
    CompileError, Diagnostic, Diagnostics, LexErrorKind, Related, Result, Severity, Span,
};
pub use groups::{GroupInfo, GroupRegistry};
pub use lexer::{BuiltinClass, Keyword, Lexer, Token, TokenKind, tokenize};
pub use parser::{Parser, parse};
pub use printer::DiagnosticsPrinter;
pub use quantifier::{Quantity, normalize, normalize_program};
pub use resolver::{Binding, ResolvedProgram, SymbolTable, resolve};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end() {
        // source -> tokens -> AST -> resolved -> pattern
        let source = r#"let digits = some of <digit>; match capture n digits;"#;
        assert_eq!(tokenize(source).last().unwrap().kind, TokenKind::Eof);
        let program = parse(source).unwrap();
        assert_eq!(program.statements.len(), 2);
        let result = compile(source).unwrap();
        assert_eq!(result.pattern, r"(?<n>\d+)");
        assert_eq!(result.capture_names, vec!["n".to_string()]);
    }

    #[test]
    fn test_types_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Program>();
        assert_send_sync::<Diagnostics>();
        assert_send_sync::<RegexPattern>();
    }
}
