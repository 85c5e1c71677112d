//! Binding resolution
//!
//! Walks the program once in declaration order, moving every `let` body into
//! a [`SymbolTable`] arena and pointing each variable reference at the
//! [`BindingId`] it names. Only bindings declared earlier are visible, so the
//! only cycle a program can contain is a binding that mentions itself.

use std::collections::HashMap;

use log::{debug, trace};

use crate::ast::{BindingId, Expression, MatchStatement, NotTarget, Program, RuleKind, Statement};
use crate::error::{CompileError, Diagnostic, Diagnostics, Result, Span};

/// A `let` binding owned by the symbol table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    /// Span of the name in the `let` statement
    pub name_span: Span,
    pub body: Expression,
    /// How many variable references resolved to this binding
    pub references: u32,
}

/// Arena of bindings plus the name scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    bindings: Vec<Binding>,
    scope: HashMap<String, BindingId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Add a binding to the arena and bring its name into scope
    fn declare(&mut self, name: &str, name_span: Span, body: Expression) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            name: name.to_string(),
            name_span,
            body,
            references: 0,
        });
        self.scope.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<BindingId> {
        self.scope.get(name).copied()
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.index())
    }

    fn get_mut(&mut self, id: BindingId) -> Option<&mut Binding> {
        self.bindings.get_mut(id.index())
    }

    /// Bindings in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| (BindingId(index as u32), binding))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// A program whose variable references all point into its symbol table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProgram {
    pub symbols: SymbolTable,
    /// `match` statements in program order
    pub matches: Vec<MatchStatement>,
    /// Warnings collected so far; errors never reach this far
    pub warnings: Diagnostics,
}

struct Resolver {
    symbols: SymbolTable,
    /// First declaration of every `let` name, used to explain forward references
    declarations: HashMap<String, Span>,
    /// The binding whose body is being resolved
    resolving: Option<BindingId>,
    diagnostics: Diagnostics,
}

impl Resolver {
    fn new(program: &Program) -> Self {
        let mut declarations = HashMap::new();
        for statement in program.lets() {
            declarations
                .entry(statement.name.name.clone())
                .or_insert(statement.name.span);
        }

        Resolver {
            symbols: SymbolTable::new(),
            declarations,
            resolving: None,
            diagnostics: Diagnostics::new(),
        }
    }

    fn resolve_program(&mut self, program: Program) -> Vec<MatchStatement> {
        let mut matches = Vec::new();

        for statement in program.statements {
            match statement {
                Statement::Let(mut statement) => {
                    let name = &statement.name;
                    if let Some(existing) = self.symbols.lookup(&name.name) {
                        let first = self
                            .symbols
                            .get(existing)
                            .map_or(name.span, |binding| binding.name_span);
                        self.diagnostics.push(
                            Diagnostic::new(
                                CompileError::DuplicateBinding(name.name.clone()),
                                name.span,
                            )
                            .with_related("first defined here", first),
                        );
                        self.resolve_expression(&mut statement.body);
                        continue;
                    }

                    let placeholder = Expression::new(Vec::new(), statement.body.span);
                    let id = self.symbols.declare(&name.name, name.span, placeholder);
                    trace!("declared `{}` as {:?}", name.name, id);

                    self.resolving = Some(id);
                    self.resolve_expression(&mut statement.body);
                    self.resolving = None;

                    if let Some(binding) = self.symbols.get_mut(id) {
                        binding.body = statement.body;
                    }
                }
                Statement::Match(mut statement) => {
                    self.resolve_expression(&mut statement.body);
                    matches.push(statement);
                }
            }
        }

        for (_, binding) in self.symbols.iter() {
            if binding.references == 0 {
                self.diagnostics.report(
                    CompileError::UnusedBinding(binding.name.clone()),
                    binding.name_span,
                );
            }
        }

        matches
    }

    fn resolve_expression(&mut self, expression: &mut Expression) {
        for rule in &mut expression.rules {
            let span = rule.span;
            match &mut rule.kind {
                RuleKind::Ahead { body }
                | RuleKind::Behind { body }
                | RuleKind::Capture { body, .. }
                | RuleKind::Of { body, .. }
                | RuleKind::Group { body } => self.resolve_expression(body),
                RuleKind::Not { target } => match target {
                    NotTarget::Ahead(body) | NotTarget::Behind(body) => {
                        self.resolve_expression(body)
                    }
                    NotTarget::Symbols(_) => {}
                },
                RuleKind::Either { branches } => {
                    for branch in branches {
                        self.resolve_expression(branch);
                    }
                }
                RuleKind::Variable { name, binding } => {
                    *binding = self.resolve_reference(name, span);
                }
                RuleKind::String { .. } | RuleKind::Raw { .. } | RuleKind::Symbols(_) => {}
            }
        }
    }

    fn resolve_reference(&mut self, name: &str, span: Span) -> Option<BindingId> {
        let Some(id) = self.symbols.lookup(name) else {
            let mut diagnostic =
                Diagnostic::new(CompileError::UndefinedVariable(name.to_string()), span);
            if let Some(declared) = self.declarations.get(name) {
                diagnostic = diagnostic.with_related("declared later here", *declared);
            }
            self.diagnostics.push(diagnostic);
            return None;
        };

        if self.resolving == Some(id) {
            let declared = self
                .symbols
                .get(id)
                .map_or(span, |binding| binding.name_span);
            self.diagnostics.push(
                Diagnostic::new(CompileError::CircularBinding(name.to_string()), span)
                    .with_related("while defining this variable", declared),
            );
            return None;
        }

        if let Some(binding) = self.symbols.get_mut(id) {
            binding.references += 1;
        }
        Some(id)
    }
}

/// Resolve every variable reference in a parsed program
pub fn resolve(program: Program) -> Result<ResolvedProgram> {
    let mut resolver = Resolver::new(&program);
    let matches = resolver.resolve_program(program);

    debug!(
        "resolved {} bindings and {} match statements",
        resolver.symbols.len(),
        matches.len()
    );

    if resolver.diagnostics.has_errors() {
        return Err(resolver.diagnostics);
    }
    Ok(ResolvedProgram {
        symbols: resolver.symbols,
        matches,
        warnings: resolver.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Rule;
    use crate::parser::parse;

    fn resolve_source(input: &str) -> Result<ResolvedProgram> {
        resolve(parse(input).unwrap())
    }

    fn first_rule(expression: &Expression) -> &Rule {
        &expression.rules[0]
    }

    #[test]
    fn test_resolve_reference() {
        let resolved = resolve_source(r#"let a = "x"; match a;"#).unwrap();
        assert_eq!(resolved.symbols.len(), 1);
        assert_eq!(resolved.symbols.lookup("a"), Some(BindingId(0)));
        assert_eq!(
            first_rule(&resolved.matches[0].body).kind,
            RuleKind::Variable {
                name: "a".to_string(),
                binding: Some(BindingId(0)),
            }
        );
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn test_binding_body_moved_into_arena() {
        let resolved = resolve_source(r#"let a = "x"; let b = a a; match b;"#).unwrap();
        let (_, b) = resolved.symbols.iter().nth(1).unwrap();
        assert_eq!(b.name, "b");
        assert_eq!(b.body.rules.len(), 2);
        let (_, a) = resolved.symbols.iter().next().unwrap();
        assert_eq!(a.references, 2);
    }

    #[test]
    fn test_undefined_variable() {
        let diagnostics = resolve_source("match variable missing;").unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics.as_slice()[0];
        assert_eq!(
            diagnostic.error,
            CompileError::UndefinedVariable("missing".to_string())
        );
        assert_eq!(diagnostic.span, Span::new(6, 22));
        assert!(diagnostic.related.is_empty());
    }

    #[test]
    fn test_forward_reference_has_related_note() {
        let diagnostics = resolve_source(r#"match a; let a = "x";"#).unwrap_err();
        let diagnostic = &diagnostics.as_slice()[0];
        assert_eq!(
            diagnostic.error,
            CompileError::UndefinedVariable("a".to_string())
        );
        assert_eq!(diagnostic.related.len(), 1);
        assert_eq!(diagnostic.related[0].span, Span::new(13, 14));
        // the later binding is never referenced either
        assert!(diagnostics.contains(&CompileError::UnusedBinding("a".to_string())));
    }

    #[test]
    fn test_circular_binding() {
        let diagnostics = resolve_source(r#"let a = "x" a; match "y";"#).unwrap_err();
        assert!(diagnostics.contains(&CompileError::CircularBinding("a".to_string())));
        let diagnostic = &diagnostics.as_slice()[0];
        assert_eq!(diagnostic.span, Span::new(12, 13));
        assert_eq!(diagnostic.related[0].span, Span::new(4, 5));
    }

    #[test]
    fn test_duplicate_binding() {
        let diagnostics =
            resolve_source(r#"let a = "x"; let a = missing; match a;"#).unwrap_err();
        let errors: Vec<_> = diagnostics.iter().map(|d| d.error.clone()).collect();
        assert_eq!(
            errors,
            vec![
                CompileError::DuplicateBinding("a".to_string()),
                CompileError::UndefinedVariable("missing".to_string()),
            ]
        );
        let duplicate = &diagnostics.as_slice()[0];
        assert_eq!(duplicate.span, Span::new(17, 18));
        assert_eq!(duplicate.related[0].span, Span::new(4, 5));
    }

    #[test]
    fn test_unused_binding_is_warning() {
        let resolved = resolve_source(r#"let unused = "x"; match "y";"#).unwrap();
        assert_eq!(resolved.warnings.warning_count(), 1);
        let warning = &resolved.warnings.as_slice()[0];
        assert_eq!(
            warning.error,
            CompileError::UnusedBinding("unused".to_string())
        );
        assert_eq!(warning.span, Span::new(4, 10));
    }

    #[test]
    fn test_references_inside_nested_rules() {
        let input = r#"let d = <digit>;
            match capture { either { d, not ahead d } } 2 of d;"#;
        let resolved = resolve_source(input).unwrap();
        let (_, d) = resolved.symbols.iter().next().unwrap();
        assert_eq!(d.references, 3);
    }

    #[test]
    fn test_matches_kept_in_order() {
        let resolved = resolve_source(r#"match "a"; match "b";"#).unwrap();
        assert_eq!(resolved.matches.len(), 2);
        assert_eq!(resolved.matches[1].span, Span::new(11, 21));
    }
}
