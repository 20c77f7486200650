use crate::script::error::SyntaxError;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    FString(Vec<FStringPiece>),

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,

    // Keywords
    And,
    Or,
    Not,
    In,
    If,
    Elif,
    Else,
    For,
    While,
    Break,
    Continue,
    Pass,
    Raise,
    Assert,
    True,
    False,
    None,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
}

/// A piece of an f-string: literal text or the source of an `{expr}`.
#[derive(Debug, Clone, PartialEq)]
pub enum FStringPiece {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line the token starts on.
    pub line: usize,
}

fn keyword(name: &str) -> Option<TokenKind> {
    Some(match name {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "if" => TokenKind::If,
        "elif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "pass" => TokenKind::Pass,
        "raise" => TokenKind::Raise,
        "assert" => TokenKind::Assert,
        "True" => TokenKind::True,
        "False" => TokenKind::False,
        "None" => TokenKind::None,
        _ => return None,
    })
}

const TAB_STOP: usize = 8;
const MAX_INDENT_LEVELS: usize = 100;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Split fragment source into tokens, with indentation turned into
/// `Indent`/`Dedent` and logical line ends into `Newline`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source, 1).run(true)
}

/// Tokenize an expression embedded in an f-string. No layout tokens are
/// produced apart from the final `Eof`.
pub fn tokenize_expression(source: &str, line: usize) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source, line).run(false)
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    /// Open `(`, `[` and `{` count; newlines inside brackets are ignored.
    depth: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str, line: usize) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line,
            depth: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token { kind, line });
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(message, self.line)
    }

    fn last_is_newline(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(TokenKind::Newline)
        )
    }

    fn run(mut self, layout: bool) -> Result<Vec<Token>, SyntaxError> {
        let mut indents = vec![0usize];
        let mut at_line_start = layout;

        loop {
            if at_line_start {
                at_line_start = false;
                let width = self.measure_indent();
                match self.peek() {
                    // Blank or comment-only line.
                    None => break,
                    Some('\n') => {
                        self.pos += 1;
                        self.line += 1;
                        at_line_start = true;
                        continue;
                    }
                    Some('#') => {
                        self.skip_comment();
                        if self.peek() == Some('\n') {
                            self.pos += 1;
                            self.line += 1;
                            at_line_start = true;
                        }
                        continue;
                    }
                    Some(_) => self.indentation(width, &mut indents)?,
                }
            }

            self.skip_inline_whitespace();
            let Some(c) = self.peek() else { break };
            let line = self.line;

            match c {
                '\n' => {
                    self.pos += 1;
                    if self.depth == 0 && layout {
                        if !self.last_is_newline() {
                            self.push(TokenKind::Newline, line);
                        }
                        at_line_start = true;
                    }
                    self.line += 1;
                }
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                '\\' if self.peek_at(1) == Some('\r') && self.peek_at(2) == Some('\n') => {
                    self.pos += 3;
                    self.line += 1;
                }
                '#' => self.skip_comment(),
                '0'..='9' => self.number()?,
                '\'' | '"' => {
                    let text = self.string()?;
                    self.push(TokenKind::Str(text), line);
                }
                c if c == '_' || c.is_alphabetic() => self.word()?,
                _ => self.operator()?,
            }
        }

        if layout {
            if !self.last_is_newline() {
                self.push(TokenKind::Newline, self.line);
            }
            while indents.len() > 1 {
                indents.pop();
                self.push(TokenKind::Dedent, self.line);
            }
        }
        self.push(TokenKind::Eof, self.line);
        Ok(self.tokens)
    }

    /// Width of the leading whitespace, tabs advancing to the next tab stop.
    fn measure_indent(&mut self) -> usize {
        let mut width = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' => width += 1,
                '\t' => width = (width / TAB_STOP + 1) * TAB_STOP,
                '\r' | '\x0c' => {}
                _ => break,
            }
            self.pos += 1;
        }
        width
    }

    fn indentation(&mut self, width: usize, indents: &mut Vec<usize>) -> Result<(), SyntaxError> {
        let current = indents.last().copied().unwrap_or(0);
        if width > current {
            if indents.len() > MAX_INDENT_LEVELS {
                return Err(SyntaxError::indentation(
                    "too many levels of indentation",
                    self.line,
                ));
            }
            indents.push(width);
            self.push(TokenKind::Indent, self.line);
        } else if width < current {
            while indents.last().is_some_and(|&level| level > width) {
                indents.pop();
                self.push(TokenKind::Dedent, self.line);
            }
            if indents.last().copied().unwrap_or(0) != width {
                return Err(SyntaxError::indentation(
                    "unindent does not match any outer indentation level",
                    self.line,
                ));
            }
        }
        Ok(())
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\x0c')) {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
    }

    fn word(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        let start = self.pos;
        while self.peek().is_some_and(|c| c == '_' || c.is_alphanumeric()) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();

        if matches!(word.as_str(), "f" | "F") && matches!(self.peek(), Some('\'' | '"')) {
            let raw = self.string_body(false)?;
            let pieces = split_fstring(&raw, line)?;
            self.push(TokenKind::FString(pieces), line);
            return Ok(());
        }

        let kind = keyword(&word).unwrap_or(TokenKind::Name(word));
        self.push(kind, line);
        Ok(())
    }

    fn number(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        let start = self.pos;
        let mut is_float = false;

        self.digits();
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.pos += 1;
            self.digits();
        } else if self.peek() == Some('.') && !self.peek_at(1).is_some_and(|c| c.is_alphabetic()) {
            // `1.` is a float; `1.real` would be attribute access.
            is_float = true;
            self.pos += 1;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1 + sign;
                self.digits();
            }
        }

        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        let kind = if is_float {
            TokenKind::Float(
                text.parse()
                    .map_err(|_| self.error(format!("invalid float literal '{}'", text)))?,
            )
        } else {
            TokenKind::Int(
                text.parse()
                    .map_err(|_| self.error(format!("integer literal '{}' is too large", text)))?,
            )
        };
        self.push(kind, line);
        Ok(())
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.pos += 1;
        }
    }

    /// A quoted string with escapes resolved.
    fn string(&mut self) -> Result<String, SyntaxError> {
        self.string_body(true)
    }

    /// Read a single- or triple-quoted string starting at the opening
    /// quote. With `unescape` false, backslash escapes are kept as written.
    fn string_body(&mut self, unescape: bool) -> Result<String, SyntaxError> {
        let start_line = self.line;
        let quote = self.peek().ok_or_else(|| self.error("expected string"))?;
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut text = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(SyntaxError::new(
                    if triple {
                        "unterminated triple-quoted string literal"
                    } else {
                        "unterminated string literal"
                    },
                    start_line,
                ));
            };
            match c {
                '\\' => {
                    let escaped = self.peek_at(1).ok_or_else(|| {
                        SyntaxError::new("unterminated string literal", start_line)
                    })?;
                    self.pos += 2;
                    if escaped == '\n' {
                        self.line += 1;
                        continue;
                    }
                    if unescape {
                        text.push(unescape_char(escaped));
                    } else {
                        text.push('\\');
                        text.push(escaped);
                    }
                }
                '\n' if !triple => {
                    return Err(SyntaxError::new("unterminated string literal", start_line));
                }
                c if c == quote
                    && (!triple
                        || (self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote))) =>
                {
                    self.pos += if triple { 3 } else { 1 };
                    return Ok(text);
                }
                c => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn operator(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        let c = self.peek().ok_or_else(|| self.error("unexpected end of input"))?;
        let next = self.peek_at(1);

        let (kind, len) = match (c, next) {
            ('*', Some('*')) => (TokenKind::DoubleStar, 2),
            ('*', Some('=')) => (TokenKind::StarAssign, 2),
            ('/', Some('/')) => (TokenKind::DoubleSlash, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('+', Some('=')) => (TokenKind::PlusAssign, 2),
            ('-', Some('=')) => (TokenKind::MinusAssign, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('=', _) => (TokenKind::Assign, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('.', _) => (TokenKind::Dot, 1),
            ('(', _) => (TokenKind::LParen, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            (')', _) => (TokenKind::RParen, 1),
            (']', _) => (TokenKind::RBracket, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            (c, _) => return Err(self.error(format!("invalid character '{}'", c))),
        };

        match kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => self.depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                self.depth = self.depth.saturating_sub(1)
            }
            _ => {}
        }

        self.pos += len;
        self.push(kind, line);
        Ok(())
    }
}

fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}

// ---------------------------------------------------------------------------
// f-strings
// ---------------------------------------------------------------------------

/// Split the raw body of an f-string into literal text and `{expr}` sources.
fn split_fstring(raw: &str, line: usize) -> Result<Vec<FStringPiece>, SyntaxError> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    literal.push(unescape_char(escaped));
                }
            }
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => {
                return Err(SyntaxError::new(
                    "f-string: single '}' is not allowed",
                    line,
                ));
            }
            '{' => {
                let mut depth = 0usize;
                let mut expr = String::new();
                loop {
                    match chars.next() {
                        None => {
                            return Err(SyntaxError::new("f-string: expecting '}'", line));
                        }
                        Some('}') if depth == 0 => break,
                        Some(c) => {
                            match c {
                                '(' | '[' | '{' => depth += 1,
                                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                                _ => {}
                            }
                            expr.push(c);
                        }
                    }
                }
                if expr.trim().is_empty() {
                    return Err(SyntaxError::new(
                        "f-string: empty expression not allowed",
                        line,
                    ));
                }
                if !literal.is_empty() {
                    pieces.push(FStringPiece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(FStringPiece::Expr(expr));
            }
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        pieces.push(FStringPiece::Literal(literal));
    }
    Ok(pieces)
}
