//! The data structures passed between passes, in pipeline order:
//! [token] out of the lexer, [ast] (living in an [arena]) out of the parser,
//! [asm] out of the generator.

pub mod arena;
pub mod asm;
pub mod ast;
pub mod token;
