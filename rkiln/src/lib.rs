// all roads lead to lib.rs

#[macro_use]
extern crate log;

mod intermediates;
pub mod passes;
pub mod span;

pub use intermediates::{arena, asm, ast, token};
pub use passes::{emit, generate, parse, tokenize, GenerateError, LexError, ParseError};

/// Whichever pass failed first, and how
#[derive(Debug, PartialEq)]
pub enum CompileError {
    Lex(LexError),
    Parse(ParseError),
    Generate(GenerateError),
}
impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CompileError::Lex(err) => write!(f, "{}", err),
            CompileError::Parse(err) => write!(f, "{}", err),
            CompileError::Generate(err) => write!(f, "{}", err),
        }
    }
}
impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Lex(err) => Some(err),
            CompileError::Parse(err) => Some(err),
            CompileError::Generate(err) => Some(err),
        }
    }
}
impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        CompileError::Lex(err)
    }
}
impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        CompileError::Parse(err)
    }
}
impl From<GenerateError> for CompileError {
    fn from(err: GenerateError) -> Self {
        CompileError::Generate(err)
    }
}

/// source text in, NASM text out
pub fn compile(text: &str) -> Result<String, CompileError> {
    let program = parse(tokenize(text)?)?;
    let instructions = generate(&program)?;
    Ok(emit(&instructions))
}
