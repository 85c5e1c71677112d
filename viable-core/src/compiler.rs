//! The compilation pipeline
//!
//! Stages run in a fixed order: parse, resolve, normalize, generate. Each stage
//! appends to the diagnostics of the ones before it, and the pipeline stops at
//! the first stage boundary where any error has been reported.

use std::fmt;

use log::debug;

use crate::ast::Program;
use crate::codegen::{RegexPattern, generate};
use crate::error::Result;
use crate::lexer::tokenize;
use crate::parser::parse;
use crate::quantifier::normalize_program;
use crate::resolver::resolve;

/// Compile Viable source text to a regex pattern
///
/// # Example
/// ```
/// use viable_core::compile;
///
/// let result = compile(r#"match capture "a" either { "b", "c" };"#).unwrap();
/// assert_eq!(result.pattern, "(a)(?:b|c)");
/// ```
pub fn compile(source: &str) -> Result<RegexPattern> {
    compile_program(parse(source)?)
}

/// Run every stage after parsing
fn compile_program(program: Program) -> Result<RegexPattern> {
    debug!("parse: {} statements", program.statements.len());

    let mut resolved = resolve(program)?;

    let mut diagnostics = std::mem::take(&mut resolved.warnings);
    diagnostics.extend(normalize_program(&resolved));
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }
    resolved.warnings = diagnostics;

    generate(resolved)
}

/// Compile with intermediate results kept for debugging
pub fn compile_debug(source: &str) -> Result<CompileReport> {
    let token_count = tokenize(source).len();
    let program = parse(source)?;
    let ast = format!("{:#?}", program);
    let result = compile_program(program)?;

    Ok(CompileReport {
        input: source.to_string(),
        token_count,
        ast,
        result,
    })
}

/// Result of a compilation with debug information
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// The original source text
    pub input: String,
    /// Number of tokens, including comments and the end marker
    pub token_count: usize,
    /// The AST representation (pretty debug format)
    pub ast: String,
    /// The compiled pattern
    pub result: RegexPattern,
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Report")?;
        writeln!(f, "==================")?;
        writeln!(f, "Input:    {}", self.input.trim_end())?;
        writeln!(f, "Tokens:   {}", self.token_count)?;
        writeln!(f, "AST:      {}", self.ast)?;
        writeln!(f, "Captures: {}", self.result.capture_names.join(", "))?;
        write!(f, "Output:   {}", self.result.pattern)
    }
}
