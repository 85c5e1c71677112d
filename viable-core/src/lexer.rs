//! Lexer for tokenizing Viable source text
//!
//! The lexer is total: it never fails. Input it cannot make sense of becomes a
//! [`TokenKind::Error`] token that the parser later reports as a diagnostic.
//! Comments are kept as [`TokenKind::Comment`] tokens so editors can highlight
//! them; the parser skips them as trivia.

use std::fmt;

use crate::error::{LexErrorKind, Span};

/// A built-in character class written as `<name>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinClass {
    Digit,
    Word,
    Alphabetic,
    Alphanumeric,
    Whitespace,
    Boundary,
    Start,
    End,
    Newline,
    Tab,
    Space,
    Return,
    Feed,
    Backspace,
    Null,
    Vertical,
    Char,
}

static BUILTIN_CLASSES: &[(&str, BuiltinClass)] = &[
    ("digit", BuiltinClass::Digit),
    ("word", BuiltinClass::Word),
    ("alphabetic", BuiltinClass::Alphabetic),
    ("alphanumeric", BuiltinClass::Alphanumeric),
    ("whitespace", BuiltinClass::Whitespace),
    ("boundary", BuiltinClass::Boundary),
    ("start", BuiltinClass::Start),
    ("end", BuiltinClass::End),
    ("newline", BuiltinClass::Newline),
    ("tab", BuiltinClass::Tab),
    ("space", BuiltinClass::Space),
    ("return", BuiltinClass::Return),
    ("feed", BuiltinClass::Feed),
    ("backspace", BuiltinClass::Backspace),
    ("null", BuiltinClass::Null),
    ("vertical", BuiltinClass::Vertical),
    ("char", BuiltinClass::Char),
];

impl BuiltinClass {
    /// Look up a class by the name between the angle brackets
    pub fn from_name(name: &str) -> Option<BuiltinClass> {
        BUILTIN_CLASSES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, class)| *class)
    }

    /// The name between the angle brackets
    pub fn name(self) -> &'static str {
        BUILTIN_CLASSES
            .iter()
            .find(|(_, class)| *class == self)
            .map(|(n, _)| *n)
            .unwrap_or("char")
    }

    /// Zero-width classes that assert a position rather than consume a character
    pub fn is_anchor(self) -> bool {
        matches!(
            self,
            BuiltinClass::Start | BuiltinClass::End | BuiltinClass::Boundary
        )
    }
}

impl fmt::Display for BuiltinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name())
    }
}

/// Keywords of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Ahead,
    Behind,
    Capture,
    Either,
    Let,
    Match,
    Not,
    Of,
    Over,
    Option,
    Some,
    Any,
    Lazy,
    To,
    Variable,
    Symbols,
}

static KEYWORDS: &[(&str, Keyword)] = &[
    ("ahead", Keyword::Ahead),
    ("behind", Keyword::Behind),
    ("capture", Keyword::Capture),
    ("either", Keyword::Either),
    ("let", Keyword::Let),
    ("match", Keyword::Match),
    ("not", Keyword::Not),
    ("of", Keyword::Of),
    ("over", Keyword::Over),
    ("option", Keyword::Option),
    ("some", Keyword::Some),
    ("any", Keyword::Any),
    ("lazy", Keyword::Lazy),
    ("to", Keyword::To),
    ("variable", Keyword::Variable),
    ("symbols", Keyword::Symbols),
];

impl Keyword {
    pub fn from_str(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(w, _)| *w == word)
            .map(|(_, keyword)| *keyword)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| *keyword == self)
            .map(|(w, _)| *w)
            .unwrap_or("keyword")
    }
}

/// The kind of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword(Keyword),
    Builtin(BuiltinClass),
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `=`
    Equals,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// Quoted string, `"..."` or `'...'`
    String,
    /// Backtick literal copied into the pattern unescaped
    Raw,
    /// Unsigned decimal integer
    Number,
    Identifier,
    /// `// ...` or `/* ... */`
    Comment,
    Error(LexErrorKind),
    /// End of input, always the last token
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(keyword) => write!(f, "`{}`", keyword.as_str()),
            TokenKind::Builtin(class) => write!(f, "`{}`", class),
            TokenKind::LeftBrace => write!(f, "`{{`"),
            TokenKind::RightBrace => write!(f, "`}}`"),
            TokenKind::Equals => write!(f, "`=`"),
            TokenKind::Semicolon => write!(f, "`;`"),
            TokenKind::Comma => write!(f, "`,`"),
            TokenKind::String => write!(f, "string"),
            TokenKind::Raw => write!(f, "raw literal"),
            TokenKind::Number => write!(f, "number"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Comment => write!(f, "comment"),
            TokenKind::Error(kind) => write!(f, "{}", kind),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with the source text it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl Token<'_> {
    /// Comments are skipped by the parser
    pub fn is_trivia(&self) -> bool {
        self.kind == TokenKind::Comment
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String | TokenKind::Raw | TokenKind::Number | TokenKind::Identifier => {
                write!(f, "{} `{}`", self.kind, self.text)
            }
            kind => write!(f, "{}", kind),
        }
    }
}

/// Lexer for Viable source text
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of `current_char`
    position: usize,
    current_char: Option<char>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input string
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            position: 0,
            current_char: input.chars().next(),
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if let Some(c) = self.current_char {
            self.position += c.len_utf8();
            self.current_char = self.input[self.position..].chars().next();
        }
    }

    /// Peek at the character after the current one
    fn peek(&self) -> Option<char> {
        let mut chars = self.input[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token {
            kind,
            text: &self.input[start..self.position],
            span: Span::new(start, self.position),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn is_identifier_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    /// Read an identifier or keyword
    fn read_word(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.current_char {
            if Self::is_identifier_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        let kind = match Keyword::from_str(&self.input[start..self.position]) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier,
        };
        self.token(kind, start)
    }

    fn read_number(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        self.token(TokenKind::Number, start)
    }

    /// Read a string literal; the opening quote is the current character
    fn read_string(&mut self, start: usize, quote: char) -> Token<'a> {
        self.advance(); // consume opening quote
        let mut error = None;
        loop {
            match self.current_char {
                None | Some('\n') => {
                    return self.token(TokenKind::Error(LexErrorKind::UnterminatedString), start);
                }
                Some('\\') => {
                    self.advance();
                    match self.current_char {
                        None | Some('\n') => {
                            return self.token(
                                TokenKind::Error(LexErrorKind::UnterminatedString),
                                start,
                            );
                        }
                        Some(c) if unescape_char(c).is_some() => self.advance(),
                        Some(_) => {
                            error.get_or_insert(LexErrorKind::InvalidEscape);
                            self.advance();
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
            }
        }
        let kind = error.map_or(TokenKind::String, TokenKind::Error);
        self.token(kind, start)
    }

    /// Read a raw literal; the opening backtick is the current character
    ///
    /// Only `` \` `` is an escape. Every other character, backslashes included,
    /// is kept as written.
    fn read_raw(&mut self, start: usize) -> Token<'a> {
        self.advance(); // consume opening '`'
        loop {
            match self.current_char {
                None | Some('\n') => {
                    return self.token(TokenKind::Error(LexErrorKind::UnterminatedRaw), start);
                }
                Some('\\') if self.peek() == Some('`') => {
                    self.advance();
                    self.advance();
                }
                Some('`') => {
                    self.advance();
                    return self.token(TokenKind::Raw, start);
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Read `<name>`; the `<` is the current character
    fn read_builtin(&mut self, start: usize) -> Token<'a> {
        self.advance(); // consume '<'
        while let Some(c) = self.current_char {
            if c.is_ascii_alphabetic() {
                self.advance();
            } else {
                break;
            }
        }
        if self.current_char != Some('>') {
            return self.token(TokenKind::Error(LexErrorKind::UnknownClass), start);
        }
        let name = &self.input[start + 1..self.position];
        self.advance(); // consume '>'
        match BuiltinClass::from_name(name) {
            Some(class) => self.token(TokenKind::Builtin(class), start),
            None => self.token(TokenKind::Error(LexErrorKind::UnknownClass), start),
        }
    }

    fn read_line_comment(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.current_char {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        self.token(TokenKind::Comment, start)
    }

    fn read_block_comment(&mut self, start: usize) -> Token<'a> {
        self.advance(); // '/'
        self.advance(); // '*'
        loop {
            match self.current_char {
                None => {
                    return self.token(TokenKind::Error(LexErrorKind::UnterminatedComment), start);
                }
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    self.advance();
                    return self.token(TokenKind::Comment, start);
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize) -> Token<'a> {
        self.advance();
        self.token(kind, start)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        let start = self.position;
        match self.current_char {
            None => self.token(TokenKind::Eof, start),
            Some('{') => self.single(TokenKind::LeftBrace, start),
            Some('}') => self.single(TokenKind::RightBrace, start),
            Some('=') => self.single(TokenKind::Equals, start),
            Some(';') => self.single(TokenKind::Semicolon, start),
            Some(',') => self.single(TokenKind::Comma, start),
            Some(quote @ ('"' | '\'')) => self.read_string(start, quote),
            Some('`') => self.read_raw(start),
            Some('<') => self.read_builtin(start),
            Some('/') if self.peek() == Some('/') => self.read_line_comment(start),
            Some('/') if self.peek() == Some('*') => self.read_block_comment(start),
            Some(c) if c.is_ascii_digit() => self.read_number(start),
            Some(c) if Self::is_identifier_start(c) => self.read_word(start),
            Some(_) => self.single(TokenKind::Error(LexErrorKind::UnexpectedChar), start),
        }
    }

    /// Tokenize the entire input, ending with an `Eof` token
    pub fn tokenize(&mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

/// The character an escape sequence stands for, given the char after `\`
fn unescape_char(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        't' => Some('\t'),
        'r' => Some('\r'),
        'f' => Some('\u{0C}'),
        '0' => Some('\0'),
        '\\' | '"' | '\'' => Some(c),
        _ => None,
    }
}

/// Strip the quotes from a string token and resolve its escapes
///
/// The lexer has already rejected unknown escapes, so any that remain are kept
/// verbatim.
pub fn unquote(text: &str) -> String {
    let inner = match text.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let body = &text[1..];
            body.strip_suffix(quote).unwrap_or(body)
        }
        _ => text,
    };
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped) => match unescape_char(escaped) {
                Some(resolved) => value.push(resolved),
                None => {
                    value.push('\\');
                    value.push(escaped);
                }
            },
            None => value.push('\\'),
        }
    }
    value
}

/// Strip the backticks from a raw token, resolving only `` \` ``
pub fn unquote_raw(text: &str) -> String {
    let inner = text.strip_prefix('`').unwrap_or(text);
    let inner = inner.strip_suffix('`').unwrap_or(inner);
    inner.replace("\\`", "`")
}

/// Tokenize a source string
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).tokenize()
}
