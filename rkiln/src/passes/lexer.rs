// Hello, welcome to my lexer. Please like and subscribe

use crate::{
    span::Span,
    token::{Token, TokenType},
};

#[derive(Debug, PartialEq)]
pub enum LexError {
    UnexpectedChar(char, Span),
    /// span is where the `/*` opened
    UnterminatedComment(Span),
}
impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LexError::UnexpectedChar(c, span) => {
                write!(f, "[ERROR] unexpected character {:?} at {}", c, span)
            }
            LexError::UnterminatedComment(span) => {
                write!(f, "[ERROR] unterminated block comment starting at {}", span)
            }
        }
    }
}
impl std::error::Error for LexError {}

type Result<T> = std::result::Result<T, LexError>;

fn is_space(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\x0b'
}

enum NextSymbolType {
    None,
    SymbolOrId(char),
    Space,
    Digit(char),
    LineComment,
    BlockComment,
    Single(TokenType),
    Unknown(char),
}

#[derive(Debug)]
struct Lexer {
    tokens: Vec<Token>,
    /// the source backwards, so the next char is always last
    rchars: Vec<char>,
    line: usize,
    col: usize,
}

impl Lexer {
    fn new(source: &str) -> Lexer {
        Lexer { tokens: Vec::new(), rchars: source.chars().rev().collect(), line: 1, col: 1 }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        if offset < self.rchars.len() {
            Some(self.rchars[self.rchars.len() - 1 - offset])
        } else {
            None
        }
    }

    /// every char goes through here so line/col can't drift
    fn pop(&mut self) -> Option<char> {
        let c = self.rchars.pop()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn here(&self) -> (usize, usize) {
        (self.line, self.col)
    }

    /// where the last popped char was
    fn last(&self) -> (usize, usize) {
        (self.line, self.col.saturating_sub(1).max(1))
    }

    /// Classifies and consumes the first char of the next symbol. Comment
    /// openers consume both their chars
    fn next_symbol_type(&mut self) -> NextSymbolType {
        use NextSymbolType::*;

        let c = match self.peek(0) {
            Some(c) => c,
            Option::None => return None,
        };
        if c == '/' {
            match self.peek(1) {
                Some('/') => {
                    self.pop();
                    self.pop();
                    return LineComment;
                }
                Some('*') => {
                    self.pop();
                    self.pop();
                    return BlockComment;
                }
                _ => (),
            }
        }
        self.pop();

        if c.is_ascii_alphabetic() {
            SymbolOrId(c)
        } else if c.is_ascii_digit() {
            Digit(c)
        } else if is_space(c) {
            Space
        } else {
            match c {
                '(' => Single(TokenType::LParen),
                ')' => Single(TokenType::RParen),
                ';' => Single(TokenType::Semi),
                '=' => Single(TokenType::Assignment),
                '+' => Single(TokenType::Plus),
                '-' => Single(TokenType::Minus),
                '*' => Single(TokenType::Times),
                '/' => Single(TokenType::Divide),
                '{' => Single(TokenType::LCurly),
                '}' => Single(TokenType::RCurly),
                _ => Unknown(c),
            }
        }
    }

    /// pops chars onto `text` for as long as they pass `accept`
    fn take_while(&mut self, text: &mut String, accept: fn(char) -> bool) {
        while let Some(c) = self.peek(0) {
            if !accept(c) {
                break;
            }
            text.push(c);
            self.pop();
        }
    }
}

pub fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer::new(text);
    loop {
        let lo = lexer.here();
        let kind = match lexer.next_symbol_type() {
            NextSymbolType::None => {
                // This is the end of the file, which is OK, as we are not in the middle
                // of matching a token
                break;
            }
            NextSymbolType::SymbolOrId(c) => {
                let mut text = c.to_string();
                lexer.take_while(&mut text, |x| x.is_ascii_alphanumeric());
                match TokenType::keyword(&text) {
                    Some(keyword) => keyword,
                    None => TokenType::Identifier(text),
                }
            }
            NextSymbolType::Digit(c) => {
                let mut digits = c.to_string();
                lexer.take_while(&mut digits, |x| x.is_ascii_digit());
                TokenType::IntLit(digits)
            }
            NextSymbolType::Space => continue,
            NextSymbolType::LineComment => {
                // leave the newline, it's just whitespace
                while lexer.peek(0).map_or(false, |c| c != '\n') {
                    lexer.pop();
                }
                continue;
            }
            NextSymbolType::BlockComment => {
                loop {
                    match (lexer.peek(0), lexer.peek(1)) {
                        (Some('*'), Some('/')) => {
                            lexer.pop();
                            lexer.pop();
                            break;
                        }
                        (Some(_), _) => {
                            lexer.pop();
                        }
                        (None, _) => {
                            return Err(LexError::UnterminatedComment(Span::at(lo.0, lo.1)));
                        }
                    }
                }
                continue;
            }
            NextSymbolType::Single(kind) => kind,
            NextSymbolType::Unknown(c) => {
                return Err(LexError::UnexpectedChar(c, Span::at(lo.0, lo.1)));
            }
        };
        let token = Token { kind, span: Span { lo, hi: lexer.last() } };
        trace!("lexed {} at {}", token, token.span);
        lexer.tokens.push(token);
    }
    debug!("lexed {} tokens over {} lines", lexer.tokens.len(), lexer.line);
    Ok(lexer.tokens)
}
