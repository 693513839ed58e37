//! PL/0 Compiler: lexer, parser, code generator, and Python transpiler for
//! the PL/0 teaching language.
//!
//! # Pipeline
//!
//! ```text
//! source text -> Lexer -> Parser -> Program (AST) -> { Generator -> Vm | PythonTranspiler }
//! ```
//!
//! [`compile`] runs the front end only (parse, no codegen). [`codegen`]
//! and [`transpile::PythonTranspiler::generate`] consume its output.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod transpile;

pub use ast::Program;
pub use codegen::{CodegenError, Generator};
pub use error::ParseError;
pub use parser::Parser;
pub use transpile::{PythonTranspiler, TranspileError};

/// Parse `source` into an AST. Thin wrapper over [`Parser::parse`] kept at
/// the crate root so callers that only need the front end don't have to
/// reach into the `parser` module.
pub fn compile(source: &str) -> Result<Program, ParseError> {
    Parser::parse(source)
}
