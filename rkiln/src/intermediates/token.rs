//! A list of Tokens is the result of lexing, just chunked program data
//! with no regard for syntax. You're probably looking for [Token], not
//! TokenType, since you want that sweet location (span) data

use crate::span::Span;

/// The kind of token (Let, IntLit, Plus, etc), and any additional data
/// associated. Identifiers and int literals keep the exact text they were
/// lexed from
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum TokenType {
    Exit,
    Let,
    If,
    Elif,
    Else,
    Identifier(String),
    IntLit(String),
    LParen,
    RParen,
    Semi,
    Assignment,
    Plus,
    Minus,
    Times,
    Divide,
    LCurly,
    RCurly,
}

impl TokenType {
    /// the keyword a run of alphanumerics stands for, if it is one
    pub fn keyword(text: &str) -> Option<TokenType> {
        use TokenType::*;
        match text {
            "exit" => Some(Exit),
            "let" => Some(Let),
            "if" => Some(If),
            "elif" => Some(Elif),
            "else" => Some(Else),
            _ => None,
        }
    }

    /// How tightly a binary operator binds. None means the token doesn't
    /// continue an expression at all
    pub fn binary_precedence(&self) -> Option<u8> {
        use TokenType::*;
        match self {
            Plus | Minus => Some(0),
            Times | Divide => Some(1),
            _ => None,
        }
    }

    /// The source text this token was lexed from. Lexing the text again gives
    /// back the same token type, payload included
    pub fn text(&self) -> String {
        use TokenType::*;
        match self {
            Identifier(text) | IntLit(text) => text.clone(),
            _ => self.to_string(),
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use TokenType::*;
        let s = match self {
            Exit => "exit",
            Let => "let",
            If => "if",
            Elif => "elif",
            Else => "else",
            Identifier(_) => "identifier",
            IntLit(_) => "int literal",
            LParen => "(",
            RParen => ")",
            Semi => ";",
            Assignment => "=",
            Plus => "+",
            Minus => "-",
            Times => "*",
            Divide => "/",
            LCurly => "{",
            RCurly => "}",
        };
        write!(f, "{}", s)
    }
}

/// All tokens have a location ([Token::span]) and a type ([Token::kind]),
/// but only some kinds of tokens have additional data (identifier name,
/// literal digits) so THAT is encoded in the TokenType enum
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Token {
    pub kind: TokenType,
    pub span: Span,
}
impl Token {
    /// true when the kinds match, ignoring payloads
    pub fn is(&self, kind: &TokenType) -> bool {
        std::mem::discriminant(&self.kind) == std::mem::discriminant(kind)
    }
}
impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.kind {
            TokenType::Identifier(name) => write!(f, "identifier `{}`", name),
            TokenType::IntLit(digits) => write!(f, "int literal `{}`", digits),
            other => write!(f, "`{}`", other),
        }
    }
}
