//! Recursive descent parser producing the syntax tree of OTTL statements and conditions.
//!
//! The parser only knows the grammar. Whether a function exists, a path is valid for the
//! signal, or an expression is usable as a condition is decided by the validator.
use super::lexer::{LexError, Position, Token, TokenKind, tokenize};

const KEYWORDS: [&str; 4] = ["and", "or", "not", "where"];

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Bool(bool),
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn is_logical(&self) -> bool {
        matches!(self, Self::Or | Self::And)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

/// One dot separated part of a path with the keys indexing it.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: String,
    pub keys: Vec<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Argument>,
    /// Keys indexing the returned value, as in `Split(x, ",")[0]`.
    pub keys: Vec<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Path(Vec<PathSegment>),
    Call(Call),
    /// Upper case constant such as `SPAN_KIND_SERVER`.
    Enum(String),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Not(Box<Expr>),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub position: Position,
}

/// `editor(args...) [where condition]`
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub editor: Call,
    pub condition: Option<Expr>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub position: Position,
    pub message: String,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            position: err.position,
            message: err.message,
        }
    }
}

pub fn parse_condition(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input)?;
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

pub fn parse_statement(input: &str) -> Result<Statement, ParseError> {
    let mut parser = Parser::new(input)?;
    let token = parser.peek().clone();
    let TokenKind::Ident(name) = token.kind else {
        return Err(parser.unexpected("a function call"));
    };
    parser.advance();
    if parser.peek().kind != TokenKind::LParen {
        return Err(ParseError {
            position: token.position,
            message: format!("statement must start with a function call, found `{name}`"),
        });
    }
    let editor = parser.call(name, token.position)?;
    let condition = if parser.eat_keyword("where") {
        Some(parser.expression()?)
    } else {
        None
    };
    parser.expect_end()?;
    Ok(Statement { editor, condition })
}

/// Deepest nesting of parentheses, operands and arguments a user expression may use.
const MAX_DEPTH: usize = 100;

fn additive_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        _ => None,
    }
}

fn multiplicative_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        _ => None,
    }
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(input)?,
            current: 0,
            depth: 0,
        })
    }

    fn peek(&self) -> &Token {
        // tokenize always terminates the stream with Eof, so the last index is valid
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(&self.peek().kind, TokenKind::Ident(ident) if ident == keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of expression")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError {
            position: token.position,
            message: format!("expected {expected}, found {}", token.kind),
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::or)
    }

    /// Goes one nesting level deeper, failing once [MAX_DEPTH] is exceeded. Operator chains
    /// count too, since they build trees as deep as they are long.
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError {
                position: self.peek().position,
                message: format!("expression is nested deeper than {MAX_DEPTH} levels"),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let depth = self.depth;
        self.descend()?;
        let result = parse(self);
        self.depth = depth;
        result
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut lhs = self.and()?;
        while self.eat_keyword("or") {
            self.descend()?;
            let rhs = self.and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut lhs = self.not()?;
        while self.eat_keyword("and") {
            self.descend()?;
            let rhs = self.not()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr, ParseError> {
        let position = self.peek().position;
        if self.eat_keyword("not") {
            let inner = self.nested(Self::not)?;
            return Ok(Expr {
                kind: ExprKind::Not(Box::new(inner)),
                position,
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.additive()?;
        let op = match self.peek().kind {
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.additive()?;
        Ok(binary(op, lhs, rhs))
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut lhs = self.multiplicative()?;
        while let Some(op) = additive_op(&self.peek().kind) {
            self.advance();
            self.descend()?;
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut lhs = self.unary()?;
        while let Some(op) = multiplicative_op(&self.peek().kind) {
            self.advance();
            self.descend()?;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let position = self.peek().position;
        if self.eat(&TokenKind::Minus) {
            let inner = self.nested(Self::unary)?;
            return Ok(Expr {
                kind: ExprKind::Negate(Box::new(inner)),
                position,
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let position = token.position;
        let kind = match token.kind {
            TokenKind::String(s) => ExprKind::Literal(Literal::String(s)),
            TokenKind::Int(i) => ExprKind::Literal(Literal::Int(i)),
            TokenKind::Float(f) => ExprKind::Literal(Literal::Float(f)),
            TokenKind::Bytes(b) => ExprKind::Literal(Literal::Bytes(b)),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                return Ok(inner);
            }
            TokenKind::LBracket => ExprKind::List(self.list()?),
            TokenKind::LBrace => ExprKind::Map(self.map()?),
            TokenKind::Ident(ident) => return self.identifier(ident, position),
            other => {
                return Err(ParseError {
                    position,
                    message: format!("expected a value, found {other}"),
                });
            }
        };
        Ok(Expr { kind, position })
    }

    fn identifier(&mut self, ident: String, position: Position) -> Result<Expr, ParseError> {
        let literal = match ident.as_str() {
            "true" => Some(Literal::Bool(true)),
            "false" => Some(Literal::Bool(false)),
            "nil" => Some(Literal::Nil),
            _ => None,
        };
        if let Some(literal) = literal {
            return Ok(Expr {
                kind: ExprKind::Literal(literal),
                position,
            });
        }
        if KEYWORDS.contains(&ident.as_str()) {
            return Err(ParseError {
                position,
                message: format!("expected a value, found `{ident}`"),
            });
        }

        let kind = if self.peek().kind == TokenKind::LParen {
            ExprKind::Call(self.call(ident, position)?)
        } else if is_enum_name(&ident)
            && !matches!(self.peek().kind, TokenKind::Dot | TokenKind::LBracket)
        {
            ExprKind::Enum(ident)
        } else {
            ExprKind::Path(self.path(ident, position)?)
        };
        Ok(Expr { kind, position })
    }

    fn call(&mut self, name: String, position: Position) -> Result<Call, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.argument()?);
                if self.eat(&TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma)?;
            }
        }
        let keys = self.keys()?;
        Ok(Call {
            name,
            args,
            keys,
            position,
        })
    }

    fn argument(&mut self) -> Result<Argument, ParseError> {
        let named = match (&self.peek().kind, self.tokens.get(self.current + 1)) {
            (TokenKind::Ident(name), Some(next)) if next.kind == TokenKind::Assign => {
                Some(name.clone())
            }
            _ => None,
        };
        if named.is_some() {
            self.advance();
            self.advance();
        }
        Ok(Argument {
            name: named,
            value: self.expression()?,
        })
    }

    fn path(&mut self, first: String, position: Position) -> Result<Vec<PathSegment>, ParseError> {
        let mut segments = vec![PathSegment {
            name: first,
            keys: self.keys()?,
            position,
        }];
        while self.eat(&TokenKind::Dot) {
            let token = self.advance();
            let TokenKind::Ident(name) = token.kind else {
                return Err(ParseError {
                    position: token.position,
                    message: format!("expected a field name, found {}", token.kind),
                });
            };
            segments.push(PathSegment {
                name,
                keys: self.keys()?,
                position: token.position,
            });
        }
        Ok(segments)
    }

    fn keys(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut keys = Vec::new();
        while self.eat(&TokenKind::LBracket) {
            keys.push(self.expression()?);
            self.expect(TokenKind::RBracket)?;
        }
        Ok(keys)
    }

    fn list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if self.eat(&TokenKind::RBracket) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(&TokenKind::RBracket) {
                return Ok(items);
            }
            self.expect(TokenKind::Comma)?;
        }
    }

    fn map(&mut self) -> Result<Vec<(String, Expr)>, ParseError> {
        let mut entries = Vec::new();
        if self.eat(&TokenKind::RBrace) {
            return Ok(entries);
        }
        loop {
            let token = self.advance();
            let TokenKind::String(key) = token.kind else {
                return Err(ParseError {
                    position: token.position,
                    message: format!("expected a string map key, found {}", token.kind),
                });
            };
            self.expect(TokenKind::Colon)?;
            entries.push((key, self.expression()?));
            if self.eat(&TokenKind::RBrace) {
                return Ok(entries);
            }
            self.expect(TokenKind::Comma)?;
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    let position = lhs.position;
    Expr {
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        position,
    }
}

/// `SPAN_KIND_SERVER` style names. Needs at least one upper case letter, so `_` is a path.
fn is_enum_name(ident: &str) -> bool {
    ident.chars().any(|c| c.is_ascii_uppercase())
        && ident
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
