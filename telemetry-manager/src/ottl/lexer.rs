//! Tokenizer for OTTL statements and conditions.
use std::fmt;

/// Byte offset into the source expression.
pub type Position = usize;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    String(String),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Assign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(ident) => write!(f, "`{ident}`"),
            Self::String(s) => write!(f, "string \"{s}\""),
            Self::Int(i) => write!(f, "number {i}"),
            Self::Float(v) => write!(f, "number {v}"),
            Self::Bytes(_) => f.write_str("bytes literal"),
            Self::LParen => f.write_str("`(`"),
            Self::RParen => f.write_str("`)`"),
            Self::LBracket => f.write_str("`[`"),
            Self::RBracket => f.write_str("`]`"),
            Self::LBrace => f.write_str("`{`"),
            Self::RBrace => f.write_str("`}`"),
            Self::Comma => f.write_str("`,`"),
            Self::Dot => f.write_str("`.`"),
            Self::Colon => f.write_str("`:`"),
            Self::Assign => f.write_str("`=`"),
            Self::Eq => f.write_str("`==`"),
            Self::Ne => f.write_str("`!=`"),
            Self::Lt => f.write_str("`<`"),
            Self::Le => f.write_str("`<=`"),
            Self::Gt => f.write_str("`>`"),
            Self::Ge => f.write_str("`>=`"),
            Self::Plus => f.write_str("`+`"),
            Self::Minus => f.write_str("`-`"),
            Self::Star => f.write_str("`*`"),
            Self::Slash => f.write_str("`/`"),
            Self::Eof => f.write_str("end of expression"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl LexError {
    fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// Splits `input` into tokens, always terminated by [TokenKind::Eof].
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match c {
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | '.' | ':' | '+' | '-' | '*' | '/' => {
                chars.next();
                match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    ':' => TokenKind::Colon,
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    _ => TokenKind::Slash,
                }
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let followed_by_eq = chars.next_if(|&(_, next)| next == '=').is_some();
                match (c, followed_by_eq) {
                    ('=', true) => TokenKind::Eq,
                    ('=', false) => TokenKind::Assign,
                    ('!', true) => TokenKind::Ne,
                    ('<', true) => TokenKind::Le,
                    ('<', false) => TokenKind::Lt,
                    ('>', true) => TokenKind::Ge,
                    ('>', false) => TokenKind::Gt,
                    _ => return Err(LexError::new(start, "unexpected `!`")),
                }
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, '"')) => value.push('"'),
                            Some((_, '\\')) => value.push('\\'),
                            Some((_, other)) => {
                                value.push('\\');
                                value.push(other);
                            }
                            None => return Err(LexError::new(start, "unterminated string")),
                        },
                        Some((_, other)) => value.push(other),
                        None => return Err(LexError::new(start, "unterminated string")),
                    }
                }
                TokenKind::String(value)
            }
            '0'..='9' => {
                let mut end = start;
                while let Some((i, _)) = chars.next_if(|&(_, d)| d.is_ascii_alphanumeric() || d == '.') {
                    end = i;
                }
                number(&input[start..=end], start)?
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some((i, _)) = chars.next_if(|&(_, d)| d.is_alphanumeric() || d == '_') {
                    end = i;
                }
                TokenKind::Ident(input[start..=end].to_string())
            }
            other => return Err(LexError::new(start, format!("unexpected character `{other}`"))),
        };
        tokens.push(Token {
            kind,
            position: start,
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: input.len(),
    });
    Ok(tokens)
}

/// Integers, floats and `0x` prefixed byte literals.
fn number(literal: &str, position: Position) -> Result<TokenKind, LexError> {
    if let Some(hex) = literal.strip_prefix("0x") {
        if hex.is_empty() || hex.len() % 2 != 0 {
            return Err(LexError::new(position, format!("invalid bytes literal `{literal}`")));
        }
        return (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<_>, _>>()
            .map(TokenKind::Bytes)
            .map_err(|_| LexError::new(position, format!("invalid bytes literal `{literal}`")));
    }
    if literal.contains('.') {
        return literal
            .parse()
            .map(TokenKind::Float)
            .map_err(|_| LexError::new(position, format!("invalid number `{literal}`")));
    }
    literal
        .parse()
        .map(TokenKind::Int)
        .map_err(|_| LexError::new(position, format!("invalid number `{literal}`")))
}
