use crate::script::ast::{
    BinaryOperator, BoolOperator, CompareOperator, Constant, Expr, FStringPart, Program, Stmt,
    StmtKind, Target, UnaryOperator,
};
use crate::script::error::SyntaxError;
use crate::script::lexer::{self, FStringPiece, Token, TokenKind};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a whole fragment.
pub fn parse_program(source: &str) -> Result<Program, SyntaxError> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(tokens).program()
}

/// Parse a single expression, e.g. the inside of an f-string field.
pub fn parse_expression(source: &str, line: usize) -> Result<Expr, SyntaxError> {
    let tokens = lexer::tokenize_expression(source, line)?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr(0)?;
    if !parser.check(&TokenKind::Eof) {
        return Err(parser.error("invalid syntax"));
    }
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

// Binding powers (precedence). Higher = tighter binding.
// Left bp, right bp. For left-assoc: right = left + 1. For right-assoc: right = left.
const BP_OR: u8 = 2; // or
const BP_AND: u8 = 4; // and
const BP_NOT: u8 = 6; // not (prefix)
const BP_COMPARISON: u8 = 8; // == != < > <= >= in, not in
const BP_ADDITIVE: u8 = 10; // + -
const BP_MULTIPLICATIVE: u8 = 12; // * / // %
const BP_UNARY: u8 = 14; // - + (prefix)
const BP_POWER: u8 = 16; // **

/// Deepest expression tree a fragment may build. Each nested operand and
/// each operator in a chain counts one level.
const MAX_EXPR_DEPTH: usize = 200;

#[derive(Debug, Clone, Copy)]
enum Infix {
    Bool(BoolOperator),
    Compare(CompareOperator),
    Binary(BinaryOperator),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Number of enclosing loops, for `break`/`continue` checks.
    loop_depth: usize,
    expr_depth: usize,
    eof: Token,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let last_line = tokens.last().map(|t| t.line).unwrap_or(1);
        Parser {
            tokens,
            pos: 0,
            loop_depth: 0,
            expr_depth: 0,
            eof: Token {
                kind: TokenKind::Eof,
                line: last_line,
            },
        }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    fn line(&self) -> usize {
        self.peek().line
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, SyntaxError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let message = message.into();
        match self.peek_kind() {
            TokenKind::Eof => SyntaxError::new(
                format!("{} (unexpected end of fragment)", message),
                self.line(),
            ),
            TokenKind::Indent => SyntaxError::indentation("unexpected indent", self.line()),
            _ => SyntaxError::new(message, self.line()),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn program(&mut self) -> Result<Program, SyntaxError> {
        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::Indent => {
                    return Err(SyntaxError::indentation("unexpected indent", self.line()));
                }
                _ => body.push(self.statement()?),
            }
        }
        Ok(Program { body })
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        match self.peek_kind() {
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            _ => {
                let stmt = self.simple_statement()?;
                self.end_of_statement()?;
                Ok(stmt)
            }
        }
    }

    fn end_of_statement(&mut self) -> Result<(), SyntaxError> {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::Dedent => Ok(()),
            _ => Err(self.error("invalid syntax")),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Eof | TokenKind::Dedent
        )
    }

    fn simple_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.line();
        let kind = match self.peek_kind() {
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Break => {
                if self.loop_depth == 0 {
                    return Err(self.error("'break' outside loop"));
                }
                self.advance();
                StmtKind::Break
            }
            TokenKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(self.error("'continue' not properly in loop"));
                }
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Raise => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Raise(None)
                } else {
                    StmtKind::Raise(Some(self.parse_expr(0)?))
                }
            }
            TokenKind::Assert => {
                self.advance();
                let test = self.parse_expr(0)?;
                let message = if self.eat(&TokenKind::Comma) {
                    Some(self.parse_expr(0)?)
                } else {
                    None
                };
                StmtKind::Assert { test, message }
            }
            _ => self.expression_statement()?,
        };
        Ok(Stmt { kind, line })
    }

    /// Expression statement, assignment or augmented assignment.
    fn expression_statement(&mut self) -> Result<StmtKind, SyntaxError> {
        let expr = self.parse_expr(0)?;

        let operator = match self.peek_kind() {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinaryOperator::Add),
            TokenKind::MinusAssign => Some(BinaryOperator::Sub),
            TokenKind::StarAssign => Some(BinaryOperator::Mul),
            _ => return Ok(StmtKind::Expr(expr)),
        };

        let target = self.target(expr)?;
        self.advance();
        let value = self.parse_expr(0)?;
        Ok(match operator {
            None => StmtKind::Assign { target, value },
            Some(operator) => StmtKind::AugAssign {
                target,
                operator,
                value,
            },
        })
    }

    fn target(&self, expr: Expr) -> Result<Target, SyntaxError> {
        match expr {
            Expr::Name(name) => Ok(Target::Name(name)),
            Expr::Index { object, index } => match *object {
                Expr::Name(name) => Ok(Target::Index {
                    name,
                    index: *index,
                }),
                _ => Err(self.error("cannot assign to nested subscript")),
            },
            _ => Err(self.error("cannot assign to expression")),
        }
    }

    /// An indented block, or a single simple statement on the header line.
    fn suite(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.expect(&TokenKind::Colon, "':'")?;

        if !self.eat(&TokenKind::Newline) {
            let stmt = self.simple_statement()?;
            self.end_of_statement()?;
            return Ok(vec![stmt]);
        }

        if !self.eat(&TokenKind::Indent) {
            return Err(SyntaxError::indentation(
                "expected an indented block",
                self.line(),
            ));
        }

        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.check(&TokenKind::Eof) {
            if self.eat(&TokenKind::Newline) {
                continue;
            }
            body.push(self.statement()?);
        }
        self.eat(&TokenKind::Dedent);
        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.advance().line;
        let mut branches = Vec::new();

        let condition = self.parse_expr(0)?;
        branches.push((condition, self.suite()?));

        while self.eat(&TokenKind::Elif) {
            let condition = self.parse_expr(0)?;
            branches.push((condition, self.suite()?));
        }

        let orelse = if self.eat(&TokenKind::Else) {
            self.suite()?
        } else {
            Vec::new()
        };

        Ok(Stmt {
            kind: StmtKind::If { branches, orelse },
            line,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.advance().line;
        let condition = self.parse_expr(0)?;
        let body = self.loop_body()?;
        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            line,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let line = self.advance().line;
        let target = match self.advance().kind {
            TokenKind::Name(name) => name,
            _ => return Err(SyntaxError::new("expected loop variable", line)),
        };
        self.expect(&TokenKind::In, "'in'")?;
        let iterable = self.parse_expr(0)?;
        let body = self.loop_body()?;
        Ok(Stmt {
            kind: StmtKind::For {
                target,
                iterable,
                body,
            },
            line,
        })
    }

    fn loop_body(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        self.loop_depth += 1;
        let body = self.suite();
        self.loop_depth -= 1;
        body
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        let depth = self.expr_depth;
        let expr = self.parse_binding(min_bp);
        self.expr_depth = depth;
        expr
    }

    fn nest(&mut self) -> Result<(), SyntaxError> {
        if self.expr_depth >= MAX_EXPR_DEPTH {
            return Err(SyntaxError::new("expression too deeply nested", self.line()));
        }
        self.expr_depth += 1;
        Ok(())
    }

    fn parse_binding(&mut self, min_bp: u8) -> Result<Expr, SyntaxError> {
        self.nest()?;
        let mut left = self.parse_prefix()?;
        // True while `left` is a comparison built by this loop, so that
        // `a < b < c` extends it instead of nesting.
        let mut chained = false;

        loop {
            let Some((infix, l_bp, r_bp, width)) = self.infix() else {
                break;
            };
            if l_bp < min_bp {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            self.nest()?;
            let right = self.parse_expr(r_bp)?;

            left = match infix {
                Infix::Compare(operator) => match left {
                    Expr::Compare {
                        left: first,
                        mut comparisons,
                    } if chained => {
                        comparisons.push((operator, right));
                        Expr::Compare {
                            left: first,
                            comparisons,
                        }
                    }
                    other => Expr::Compare {
                        left: Box::new(other),
                        comparisons: vec![(operator, right)],
                    },
                },
                Infix::Bool(operator) => Expr::Bool {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Infix::Binary(operator) => Expr::Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
            chained = matches!(infix, Infix::Compare(_));
        }

        Ok(left)
    }

    /// Infix operator at the cursor: (operator, left bp, right bp, tokens).
    fn infix(&self) -> Option<(Infix, u8, u8, usize)> {
        let compare = |op| Some((Infix::Compare(op), BP_COMPARISON, BP_COMPARISON + 1, 1));
        let binary = |op, bp: u8| Some((Infix::Binary(op), bp, bp + 1, 1));

        match self.peek_kind() {
            TokenKind::Or => Some((Infix::Bool(BoolOperator::Or), BP_OR, BP_OR + 1, 1)),
            TokenKind::And => Some((Infix::Bool(BoolOperator::And), BP_AND, BP_AND + 1, 1)),
            TokenKind::EqEq => compare(CompareOperator::Eq),
            TokenKind::NotEq => compare(CompareOperator::NotEq),
            TokenKind::Lt => compare(CompareOperator::Lt),
            TokenKind::Gt => compare(CompareOperator::Gt),
            TokenKind::LtEq => compare(CompareOperator::LtEq),
            TokenKind::GtEq => compare(CompareOperator::GtEq),
            TokenKind::In => compare(CompareOperator::In),
            TokenKind::Not if *self.peek_kind_at(1) == TokenKind::In => Some((
                Infix::Compare(CompareOperator::NotIn),
                BP_COMPARISON,
                BP_COMPARISON + 1,
                2,
            )),
            TokenKind::Plus => binary(BinaryOperator::Add, BP_ADDITIVE),
            TokenKind::Minus => binary(BinaryOperator::Sub, BP_ADDITIVE),
            TokenKind::Star => binary(BinaryOperator::Mul, BP_MULTIPLICATIVE),
            TokenKind::Slash => binary(BinaryOperator::Div, BP_MULTIPLICATIVE),
            TokenKind::DoubleSlash => binary(BinaryOperator::FloorDiv, BP_MULTIPLICATIVE),
            TokenKind::Percent => binary(BinaryOperator::Mod, BP_MULTIPLICATIVE),
            TokenKind::DoubleStar => Some((
                Infix::Binary(BinaryOperator::Pow),
                BP_POWER,
                BP_POWER,
                1,
            )),
            _ => None,
        }
    }

    fn parse_prefix(&mut self) -> Result<Expr, SyntaxError> {
        let operator = match self.peek_kind() {
            TokenKind::Not => Some((UnaryOperator::Not, BP_NOT)),
            TokenKind::Minus => Some((UnaryOperator::Neg, BP_UNARY)),
            TokenKind::Plus => Some((UnaryOperator::Pos, BP_UNARY)),
            _ => None,
        };

        match operator {
            Some((operator, bp)) => {
                self.advance();
                let operand = self.parse_expr(bp)?;
                Ok(Expr::Unary {
                    operator,
                    operand: Box::new(operand),
                })
            }
            None => {
                let atom = self.parse_atom()?;
                self.parse_postfix(atom)
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, SyntaxError> {
        if self.at_statement_end() {
            return Err(self.error("invalid syntax"));
        }
        let line = self.line();
        let token = self.advance();

        match token.kind {
            TokenKind::Int(n) => Ok(Expr::Constant(Constant::Int(n))),
            TokenKind::Float(n) => Ok(Expr::Constant(Constant::Float(n))),
            TokenKind::Str(mut s) => {
                // Adjacent literals concatenate.
                while let TokenKind::Str(next) = self.peek_kind() {
                    s.push_str(next);
                    self.advance();
                }
                Ok(Expr::Constant(Constant::Str(s)))
            }
            TokenKind::FString(pieces) => self.fstring(pieces, line),
            TokenKind::True => Ok(Expr::Constant(Constant::Bool(true))),
            TokenKind::False => Ok(Expr::Constant(Constant::Bool(false))),
            TokenKind::None => Ok(Expr::Constant(Constant::None)),
            TokenKind::Name(name) => Ok(Expr::Name(name)),

            // Parenthesized expression
            TokenKind::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }

            TokenKind::LBracket => {
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    items.push(self.parse_expr(0)?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket, "']'")?;
                Ok(Expr::List(items))
            }

            TokenKind::LBrace => {
                let mut entries = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    let key = self.parse_expr(0)?;
                    self.expect(&TokenKind::Colon, "':'")?;
                    let value = self.parse_expr(0)?;
                    entries.push((key, value));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace, "'}'")?;
                Ok(Expr::Dict(entries))
            }

            _ => Err(SyntaxError::new("invalid syntax", line)),
        }
    }

    /// Calls, attribute access and subscripts.
    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, SyntaxError> {
        loop {
            expr = match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let (args, kwargs) = self.call_arguments()?;
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                        kwargs,
                    }
                }
                TokenKind::Dot => {
                    self.advance();
                    match self.advance().kind {
                        TokenKind::Name(name) => Expr::Attribute {
                            object: Box::new(expr),
                            name,
                        },
                        _ => return Err(self.error("expected attribute name")),
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr(0)?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                _ => return Ok(expr),
            };
        }
    }

    #[allow(clippy::type_complexity)]
    fn call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<(String, Expr)>), SyntaxError> {
        let mut args = Vec::new();
        let mut kwargs: Vec<(String, Expr)> = Vec::new();

        while !self.check(&TokenKind::RParen) {
            let keyword = match (self.peek_kind(), self.peek_kind_at(1)) {
                (TokenKind::Name(name), TokenKind::Assign) => Some(name.clone()),
                _ => None,
            };
            match keyword {
                Some(name) => {
                    self.advance();
                    self.advance();
                    if kwargs.iter().any(|(existing, _)| *existing == name) {
                        return Err(self.error(format!("keyword argument repeated: {}", name)));
                    }
                    kwargs.push((name, self.parse_expr(0)?));
                }
                None => {
                    if !kwargs.is_empty() {
                        return Err(self.error("positional argument follows keyword argument"));
                    }
                    args.push(self.parse_expr(0)?);
                }
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RParen, "')'")?;
        Ok((args, kwargs))
    }

    fn fstring(&mut self, pieces: Vec<FStringPiece>, line: usize) -> Result<Expr, SyntaxError> {
        let parts = pieces
            .into_iter()
            .map(|piece| match piece {
                FStringPiece::Literal(text) => Ok(FStringPart::Literal(text)),
                FStringPiece::Expr(source) => parse_expression(&source, line)
                    .map(FStringPart::Expr)
                    .map_err(|e| SyntaxError::new(format!("f-string: {}", e.message), line)),
            })
            .collect::<Result<_, _>>()?;
        Ok(Expr::FString(parts))
    }
}
