//! Parser for Viable source text
//!
//! This module provides a recursive descent parser that converts tokens into
//! an Abstract Syntax Tree (AST). It does not stop at the first error: a rule
//! that fails inside braces skips to the matching `}`, and a statement that
//! fails skips to the next `;` or statement keyword, so a single pass reports
//! every broken statement.
//!
//! Grammar:
//!   program     := (let_stmt | match_stmt)*
//!   let_stmt    := 'let' IDENT '=' expression ';'
//!   match_stmt  := 'match' expression ';'?
//!   expression  := rule+
//!   rule        := ahead | behind | capture | either | not | of | string
//!                | raw | symbols | variable | builtin | group
//!   ahead       := 'ahead' block
//!   behind      := 'behind' block
//!   capture     := 'capture' IDENT? block
//!   either      := 'either' '{' expression ((',' | ';') expression)* (',' | ';')? '}'
//!   not         := 'not' (ahead | behind | symbols | builtin)
//!   of          := 'lazy'? quantifier 'of' block
//!   quantifier  := NUMBER | 'some' | 'option' | 'any' | 'over' NUMBER | NUMBER 'to' NUMBER
//!   symbols     := 'not'? 'symbols' '{' (item (',' item)* ','?)? '}'
//!   item        := CHAR | STRING | BUILTIN | CHAR 'to' CHAR
//!   variable    := 'variable' IDENT | IDENT
//!   raw         := RAW
//!   builtin     := BUILTIN
//!   group       := '{' expression '}'
//!   block       := '{' expression '}' | rule

use log::{debug, trace};

use crate::ast::{
    Expression, Ident, LetStatement, MatchStatement, NotTarget, Program, Quantifier, Rule,
    RuleKind, Statement, SymbolItem, SymbolItemKind, SymbolSet,
};
use crate::error::{CompileError, Diagnostics, Result, Span};
use crate::lexer::{Keyword, Lexer, Token, TokenKind, unquote, unquote_raw};

/// Parser for Viable programs
pub struct Parser<'a> {
    /// Significant tokens only, without comments, error tokens or `Eof`
    tokens: Vec<Token<'a>>,
    eof: Token<'a>,
    position: usize,
    diagnostics: Diagnostics,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input string
    ///
    /// Lexer error tokens are reported here and dropped from the stream.
    pub fn new(input: &'a str) -> Self {
        let mut diagnostics = Diagnostics::new();
        let mut tokens = Vec::new();
        let mut eof = Token {
            kind: TokenKind::Eof,
            text: "",
            span: Span::empty(input.len()),
        };

        for token in Lexer::new(input).tokenize() {
            match token.kind {
                TokenKind::Comment => {}
                TokenKind::Eof => eof = token,
                TokenKind::Error(kind) => diagnostics.report(
                    CompileError::LexError {
                        kind,
                        text: token.text.to_string(),
                    },
                    token.span,
                ),
                _ => tokens.push(token),
            }
        }
        trace!("parser input: {} significant tokens", tokens.len());

        Parser {
            tokens,
            eof,
            position: 0,
            diagnostics,
        }
    }

    /// Parse the entire input, failing if any diagnostic was reported
    pub fn parse(mut self) -> Result<Program> {
        let program = self.parse_program();
        if self.diagnostics.has_errors() {
            Err(self.diagnostics)
        } else {
            Ok(program)
        }
    }

    /// Parse the entire input, returning whatever tree recovery produced
    /// along with every diagnostic
    pub fn parse_partial(mut self) -> (Program, Diagnostics) {
        let program = self.parse_program();
        (program, self.diagnostics)
    }

    fn current(&self) -> Token<'a> {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> Token<'a> {
        self.tokens
            .get(self.position + offset)
            .copied()
            .unwrap_or(self.eof)
    }

    /// Advance to the next token, returning the one consumed
    fn advance(&mut self) -> Token<'a> {
        let token = self.current();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Expect a specific token, reporting an error if not found
    fn expect(&mut self, kind: TokenKind, expected: &str) -> Option<Token<'a>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.unexpected(expected)
        }
    }

    /// Report the current token as unexpected
    fn unexpected<T>(&mut self, expected: &str) -> Option<T> {
        let token = self.current();
        self.diagnostics.report(
            CompileError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.to_string(),
            },
            token.span,
        );
        None
    }

    fn expect_ident(&mut self, expected: &str) -> Option<Ident> {
        let token = self.expect(TokenKind::Identifier, expected)?;
        Some(Ident::new(token.text, token.span))
    }

    fn parse_number(&mut self, expected: &str) -> Option<(u32, Span)> {
        let token = self.expect(TokenKind::Number, expected)?;
        match token.text.parse::<u32>() {
            Ok(value) => Some((value, token.span)),
            Err(_) => {
                self.diagnostics.report(
                    CompileError::InvalidNumber(token.text.to_string()),
                    token.span,
                );
                None
            }
        }
    }

    /// Whether a token of this kind can begin a rule
    fn starts_rule(kind: TokenKind) -> bool {
        match kind {
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::Ahead
                    | Keyword::Behind
                    | Keyword::Capture
                    | Keyword::Either
                    | Keyword::Not
                    | Keyword::Lazy
                    | Keyword::Some
                    | Keyword::Option
                    | Keyword::Any
                    | Keyword::Over
                    | Keyword::Symbols
                    | Keyword::Variable
            ),
            TokenKind::Number
            | TokenKind::String
            | TokenKind::Raw
            | TokenKind::Identifier
            | TokenKind::Builtin(_)
            | TokenKind::LeftBrace => true,
            _ => false,
        }
    }

    /// Skip to the next statement boundary
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        loop {
            let token = self.current();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Keyword(Keyword::Let | Keyword::Match) if depth == 0 => return,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the `}` matching an already consumed `{` and consume it
    ///
    /// Returns the span of the `}`, or `None` after reporting an unterminated
    /// block if the input runs out first.
    fn skip_to_close(&mut self, open: Span) -> Option<Span> {
        let mut depth = 0usize;
        loop {
            let token = self.current();
            match token.kind {
                TokenKind::RightBrace if depth == 0 => return Some(self.advance().span),
                TokenKind::RightBrace => depth -= 1,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::Eof => return self.unterminated(open),
                _ => {}
            }
            self.advance();
        }
    }

    fn unterminated<T>(&mut self, open: Span) -> Option<T> {
        let span = open.to(self.eof.span);
        self.diagnostics
            .report(CompileError::UnterminatedBlock, span);
        None
    }

    /// program := (let_stmt | match_stmt)*
    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        loop {
            let token = self.current();
            let statement = match token.kind {
                TokenKind::Eof => break,
                TokenKind::Keyword(Keyword::Let) => self.parse_let().map(Statement::Let),
                TokenKind::Keyword(Keyword::Match) => self.parse_match().map(Statement::Match),
                _ => {
                    self.unexpected::<()>("`let` or `match`");
                    self.advance();
                    None
                }
            };
            match statement {
                Some(statement) => statements.push(statement),
                None => self.synchronize(),
            }
        }

        debug!(
            "parsed {} statements, {} diagnostics",
            statements.len(),
            self.diagnostics.len()
        );
        Program { statements }
    }

    /// let_stmt := 'let' IDENT '=' expression ';'
    fn parse_let(&mut self) -> Option<LetStatement> {
        let start = self.advance().span; // consume 'let'
        let name = self.expect_ident("variable name")?;
        self.expect(TokenKind::Equals, "`=`")?;
        let body = self.parse_expression()?;
        let end = self.expect(TokenKind::Semicolon, "`;`")?.span;

        trace!("parsed let `{}` at {}", name.name, start.to(end));
        Some(LetStatement {
            name,
            body,
            span: start.to(end),
        })
    }

    /// match_stmt := 'match' expression ';'?
    fn parse_match(&mut self) -> Option<MatchStatement> {
        let start = self.advance().span; // consume 'match'
        let body = self.parse_expression()?;
        let end = self
            .eat(TokenKind::Semicolon)
            .map_or(body.span, |token| token.span);

        Some(MatchStatement {
            body,
            span: start.to(end),
        })
    }

    /// expression := rule+
    fn parse_expression(&mut self) -> Option<Expression> {
        let mut rules = Vec::new();
        while Self::starts_rule(self.current().kind) {
            rules.push(self.parse_rule()?);
        }

        match (rules.first(), rules.last()) {
            (Some(first), Some(last)) => {
                let span = first.span.to(last.span);
                Some(Expression::new(rules, span))
            }
            _ => self.unexpected("a rule"),
        }
    }

    /// '{' expression '}', with `;` allowed between rules
    fn parse_braced(&mut self) -> Option<Expression> {
        let open = self.advance().span; // consume '{'
        let mut rules = Vec::new();

        loop {
            let token = self.current();
            match token.kind {
                TokenKind::RightBrace => {
                    if rules.is_empty() {
                        self.unexpected::<()>("a rule");
                    }
                    let close = self.advance().span;
                    return Some(Expression::new(rules, open.to(close)));
                }
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Eof => return self.unterminated(open),
                kind if Self::starts_rule(kind) => match self.parse_rule() {
                    Some(rule) => rules.push(rule),
                    None => {
                        let close = self.skip_to_close(open)?;
                        return Some(Expression::new(rules, open.to(close)));
                    }
                },
                _ => {
                    self.unexpected::<()>("a rule or `}`");
                    let close = self.skip_to_close(open)?;
                    return Some(Expression::new(rules, open.to(close)));
                }
            }
        }
    }

    /// block := '{' expression '}' | rule
    fn parse_block(&mut self) -> Option<Expression> {
        let kind = self.current().kind;
        if kind == TokenKind::LeftBrace {
            self.parse_braced()
        } else if Self::starts_rule(kind) {
            self.parse_rule().map(Expression::single)
        } else {
            self.unexpected("`{` or a rule")
        }
    }

    fn parse_rule(&mut self) -> Option<Rule> {
        let token = self.current();
        match token.kind {
            TokenKind::Keyword(Keyword::Ahead) => {
                self.advance(); // consume 'ahead'
                let body = self.parse_block()?;
                let span = token.span.to(body.span);
                Some(Rule::new(RuleKind::Ahead { body }, span))
            }
            TokenKind::Keyword(Keyword::Behind) => {
                self.advance(); // consume 'behind'
                let body = self.parse_block()?;
                let span = token.span.to(body.span);
                Some(Rule::new(RuleKind::Behind { body }, span))
            }
            TokenKind::Keyword(Keyword::Capture) => self.parse_capture(),
            TokenKind::Keyword(Keyword::Either) => self.parse_either(),
            TokenKind::Keyword(Keyword::Not) => self.parse_not(),
            TokenKind::Keyword(
                Keyword::Lazy | Keyword::Some | Keyword::Option | Keyword::Any | Keyword::Over,
            )
            | TokenKind::Number => self.parse_of(),
            TokenKind::String => {
                self.advance();
                let kind = RuleKind::String {
                    value: unquote(token.text),
                    case_sensitive: true,
                };
                Some(Rule::new(kind, token.span))
            }
            TokenKind::Raw => {
                self.advance();
                let kind = RuleKind::Raw {
                    value: unquote_raw(token.text),
                };
                Some(Rule::new(kind, token.span))
            }
            TokenKind::Keyword(Keyword::Symbols) | TokenKind::Builtin(_) => {
                let (set, span) = self.parse_symbol_set()?;
                Some(Rule::new(RuleKind::Symbols(set), span))
            }
            TokenKind::Keyword(Keyword::Variable) => {
                self.advance(); // consume 'variable'
                let name = self.expect_ident("variable name")?;
                let span = token.span.to(name.span);
                Some(Rule::new(
                    RuleKind::Variable {
                        name: name.name,
                        binding: None,
                    },
                    span,
                ))
            }
            TokenKind::Identifier => {
                self.advance();
                Some(Rule::new(
                    RuleKind::Variable {
                        name: token.text.to_string(),
                        binding: None,
                    },
                    token.span,
                ))
            }
            TokenKind::LeftBrace => {
                let body = self.parse_braced()?;
                let span = body.span;
                Some(Rule::new(RuleKind::Group { body }, span))
            }
            _ => self.unexpected("a rule"),
        }
    }

    /// capture := 'capture' IDENT? block
    ///
    /// The identifier is the capture name only when a block follows it;
    /// otherwise it is the body.
    fn parse_capture(&mut self) -> Option<Rule> {
        let start = self.advance().span; // consume 'capture'

        let name = if self.check(TokenKind::Identifier) && Self::starts_rule(self.peek(1).kind) {
            let token = self.advance();
            Some(Ident::new(token.text, token.span))
        } else {
            None
        };

        let body = self.parse_block()?;
        let span = start.to(body.span);
        Some(Rule::new(RuleKind::Capture { name, body }, span))
    }

    /// either := 'either' '{' expression ((',' | ';') expression)* (',' | ';')? '}'
    fn parse_either(&mut self) -> Option<Rule> {
        let start = self.advance().span; // consume 'either'
        let open = self.expect(TokenKind::LeftBrace, "`{`")?.span;

        let mut branches = Vec::new();
        let mut rules: Vec<Rule> = Vec::new();
        let mut reported_empty = false;

        let close = loop {
            let token = self.current();
            match token.kind {
                TokenKind::Comma | TokenKind::Semicolon => {
                    if rules.is_empty() {
                        self.diagnostics
                            .report(CompileError::EmptyAlternationBranch, token.span);
                        reported_empty = true;
                    } else {
                        branches.push(Self::branch(std::mem::take(&mut rules)));
                    }
                    self.advance();
                }
                TokenKind::RightBrace => {
                    let close = self.advance().span;
                    if !rules.is_empty() {
                        branches.push(Self::branch(std::mem::take(&mut rules)));
                    }
                    if branches.is_empty() && !reported_empty {
                        self.diagnostics
                            .report(CompileError::EmptyAlternationBranch, open.to(close));
                    }
                    break close;
                }
                TokenKind::Eof => return self.unterminated(open),
                kind if Self::starts_rule(kind) => match self.parse_rule() {
                    Some(rule) => rules.push(rule),
                    None => break self.skip_to_close(open)?,
                },
                _ => {
                    self.unexpected::<()>("a rule, `,` or `}`");
                    break self.skip_to_close(open)?;
                }
            }
        };

        Some(Rule::new(RuleKind::Either { branches }, start.to(close)))
    }

    fn branch(rules: Vec<Rule>) -> Expression {
        let span = match (rules.first(), rules.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::default(),
        };
        Expression::new(rules, span)
    }

    /// not := 'not' (ahead | behind | symbols | builtin)
    fn parse_not(&mut self) -> Option<Rule> {
        let start = self.advance().span; // consume 'not'
        let token = self.current();

        let (target, end) = match token.kind {
            TokenKind::Keyword(Keyword::Ahead) => {
                self.advance();
                let body = self.parse_block()?;
                let end = body.span;
                (NotTarget::Ahead(body), end)
            }
            TokenKind::Keyword(Keyword::Behind) => {
                self.advance();
                let body = self.parse_block()?;
                let end = body.span;
                (NotTarget::Behind(body), end)
            }
            TokenKind::Keyword(Keyword::Symbols | Keyword::Not) | TokenKind::Builtin(_) => {
                let (set, end) = self.parse_symbol_set()?;
                (NotTarget::Symbols(set), end)
            }
            _ => return self.unexpected("`ahead`, `behind`, `symbols` or a built-in class"),
        };

        Some(Rule::new(RuleKind::Not { target }, start.to(end)))
    }

    /// symbols := 'not'? 'symbols' '{' (item (',' item)* ','?)? '}' | 'not'? BUILTIN
    fn parse_symbol_set(&mut self) -> Option<(SymbolSet, Span)> {
        let start = self.current().span;
        let negated = self.eat(TokenKind::Keyword(Keyword::Not)).is_some();

        let token = self.current();
        match token.kind {
            TokenKind::Builtin(class) => {
                self.advance();
                let mut set = SymbolSet::builtin(class, token.span);
                set.negated = negated;
                return Some((set, start.to(token.span)));
            }
            TokenKind::Keyword(Keyword::Symbols) => {
                self.advance();
            }
            _ => return self.unexpected("`symbols` or a built-in class"),
        }

        let open = self.expect(TokenKind::LeftBrace, "`{`")?.span;
        let mut items = Vec::new();

        let close = loop {
            if self.check(TokenKind::RightBrace) {
                break self.advance().span;
            }
            if self.check(TokenKind::Eof) {
                return self.unterminated(open);
            }
            match self.parse_symbol_item() {
                Some(item) => items.push(item),
                None => break self.skip_to_close(open)?,
            }
            if self.eat(TokenKind::Comma).is_none() && !self.check(TokenKind::RightBrace) {
                self.unexpected::<()>("`,` or `}`");
                break self.skip_to_close(open)?;
            }
        };

        Some((SymbolSet { items, negated }, start.to(close)))
    }

    /// item := CHAR | STRING | BUILTIN | CHAR 'to' CHAR
    fn parse_symbol_item(&mut self) -> Option<SymbolItem> {
        let token = self.current();

        let item = match token.kind {
            TokenKind::Builtin(class) => {
                self.advance();
                return Some(SymbolItem::new(SymbolItemKind::Builtin(class), token.span));
            }
            TokenKind::String => {
                let value = unquote(token.text);
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => {
                        self.advance();
                        SymbolItem::new(SymbolItemKind::Char(c), token.span)
                    }
                    (Some(_), Some(_)) => {
                        self.advance();
                        return Some(SymbolItem::new(SymbolItemKind::Text(value), token.span));
                    }
                    (None, _) => return self.unexpected("a character"),
                }
            }
            _ => {
                let (c, span) = self.parse_char()?;
                SymbolItem::new(SymbolItemKind::Char(c), span)
            }
        };

        if self.eat(TokenKind::Keyword(Keyword::To)).is_none() {
            return Some(item);
        }

        let from = match item.kind {
            SymbolItemKind::Char(c) => c,
            _ => return Some(item),
        };
        let (to, end) = self.parse_char()?;
        Some(SymbolItem::new(
            SymbolItemKind::To { from, to },
            item.span.to(end),
        ))
    }

    /// A single character: one-character string, one digit or one letter
    fn parse_char(&mut self) -> Option<(char, Span)> {
        let token = self.current();
        let text = match token.kind {
            TokenKind::String => unquote(token.text),
            TokenKind::Number | TokenKind::Identifier => token.text.to_string(),
            _ => return self.unexpected("a character"),
        };

        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                self.advance();
                Some((c, token.span))
            }
            _ => self.unexpected("a single character"),
        }
    }

    /// of := 'lazy'? quantifier 'of' block
    fn parse_of(&mut self) -> Option<Rule> {
        let start = self.current().span;
        let lazy = self.eat(TokenKind::Keyword(Keyword::Lazy)).is_some();
        let (quantifier, quantifier_span) = self.parse_quantifier()?;
        let of = self.expect(TokenKind::Keyword(Keyword::Of), "`of`")?;

        if !Self::starts_rule(self.current().kind) {
            self.diagnostics
                .report(CompileError::MissingQuantifierBody, start.to(of.span));
            return None;
        }

        let body = self.parse_block()?;
        let span = start.to(body.span);
        Some(Rule::new(
            RuleKind::Of {
                quantifier,
                quantifier_span,
                lazy,
                body,
            },
            span,
        ))
    }

    /// quantifier := NUMBER | 'some' | 'option' | 'any' | 'over' NUMBER | NUMBER 'to' NUMBER
    fn parse_quantifier(&mut self) -> Option<(Quantifier, Span)> {
        let token = self.current();
        match token.kind {
            TokenKind::Number => {
                let (min, span) = self.parse_number("a number")?;
                if self.eat(TokenKind::Keyword(Keyword::To)).is_some() {
                    let (max, end) = self.parse_number("a number")?;
                    Some((Quantifier::Range(min, max), span.to(end)))
                } else {
                    Some((Quantifier::Exact(min), span))
                }
            }
            TokenKind::Keyword(Keyword::Some) => {
                self.advance();
                Some((Quantifier::Some, token.span))
            }
            TokenKind::Keyword(Keyword::Option) => {
                self.advance();
                Some((Quantifier::Option, token.span))
            }
            TokenKind::Keyword(Keyword::Any) => {
                self.advance();
                Some((Quantifier::Any, token.span))
            }
            TokenKind::Keyword(Keyword::Over) => {
                self.advance(); // consume 'over'
                let (n, end) = self.parse_number("a number")?;
                Some((Quantifier::Over(n), token.span.to(end)))
            }
            _ => self.unexpected("a quantifier"),
        }
    }
}

/// Parse a source string into a program
pub fn parse(input: &str) -> Result<Program> {
    Parser::new(input).parse()
}
