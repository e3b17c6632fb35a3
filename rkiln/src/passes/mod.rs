//! The actual passes that compile / transform from one data structure
//! to the next.
//!
//! The compilation process goes in this order:
//!
//! 1. [tokenize]
//! 2. [parse]
//! 3. [generate]
//! 4. [emit]
//!
//! Also bundled here (because there's not a great way to put them elsewhere)
//! are the error types for each pass. Every pass stops at its first error;
//! emit never fails

mod codegen;
mod generator;
mod lexer;
mod parser;

pub use codegen::emit;
pub use generator::generate;
pub use generator::GenerateError;
pub use lexer::tokenize;
pub use lexer::LexError;
pub use parser::parse;
pub use parser::ParseError;
