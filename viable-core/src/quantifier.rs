//! Quantifier normalization
//!
//! Every source quantifier (`3 of`, `some of`, `2 to 5 of`, ...) maps onto one
//! canonical [`Quantity`], which knows how to print itself as a regex
//! repetition operator.

use log::trace;

use crate::ast::{Expression, NotTarget, Quantifier, RuleKind};
use crate::error::{CompileError, Diagnostics};
use crate::resolver::ResolvedProgram;

/// Canonical repetition bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quantity {
    pub min: u32,
    /// `None` is unbounded
    pub max: Option<u32>,
    pub greedy: bool,
}

impl Quantity {
    /// Whether the quantified body can only ever match zero times
    pub fn is_zero_width(&self) -> bool {
        self.max == Some(0)
    }

    /// Convert the quantity to a regex repetition operator
    pub fn to_regex_string(&self) -> String {
        let operator = match (self.min, self.max) {
            (0, Some(1)) => "?".to_string(),
            (0, None) => "*".to_string(),
            (1, None) => "+".to_string(),
            (n, None) => format!("{{{},}}", n),
            (n, Some(m)) if n == m => format!("{{{}}}", n),
            (n, Some(m)) => format!("{{{},{}}}", n, m),
        };
        if self.greedy {
            operator
        } else {
            format!("{}?", operator)
        }
    }
}

/// Map a source quantifier onto canonical bounds
pub fn normalize(quantifier: Quantifier, lazy: bool) -> Result<Quantity, CompileError> {
    let (min, max) = match quantifier {
        Quantifier::Exact(n) => (n, Some(n)),
        Quantifier::Some => (1, None),
        Quantifier::Option => (0, Some(1)),
        Quantifier::Any => (0, None),
        Quantifier::Over(n) => (n, None),
        Quantifier::Range(min, max) if min > max => {
            return Err(CompileError::InvalidRange { min, max });
        }
        Quantifier::Range(min, max) => (min, Some(max)),
    };
    Ok(Quantity {
        min,
        max,
        greedy: !lazy,
    })
}

/// Check every quantifier in the program
///
/// Reports invalid ranges as errors and zero-width repetitions as warnings.
pub fn normalize_program(program: &ResolvedProgram) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for (_, binding) in program.symbols.iter() {
        check_expression(&binding.body, &mut diagnostics);
    }
    for statement in &program.matches {
        check_expression(&statement.body, &mut diagnostics);
    }
    diagnostics
}

fn check_expression(expression: &Expression, diagnostics: &mut Diagnostics) {
    for rule in &expression.rules {
        match &rule.kind {
            RuleKind::Of {
                quantifier,
                quantifier_span,
                lazy,
                body,
            } => {
                match normalize(*quantifier, *lazy) {
                    Ok(quantity) if quantity.is_zero_width() => {
                        diagnostics.report(CompileError::ZeroWidthQuantifier, *quantifier_span);
                    }
                    Ok(quantity) => trace!("`{}` normalized to {:?}", quantifier, quantity),
                    Err(error) => diagnostics.report(error, *quantifier_span),
                }
                check_expression(body, diagnostics);
            }
            RuleKind::Ahead { body }
            | RuleKind::Behind { body }
            | RuleKind::Capture { body, .. }
            | RuleKind::Group { body } => check_expression(body, diagnostics),
            RuleKind::Not {
                target: NotTarget::Ahead(body) | NotTarget::Behind(body),
            } => check_expression(body, diagnostics),
            RuleKind::Either { branches } => {
                for branch in branches {
                    check_expression(branch, diagnostics);
                }
            }
            RuleKind::Not {
                target: NotTarget::Symbols(_),
            }
            | RuleKind::String { .. }
            | RuleKind::Raw { .. }
            | RuleKind::Symbols(_)
            | RuleKind::Variable { .. } => {}
        }
    }
}
