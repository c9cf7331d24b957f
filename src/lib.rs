//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the statements with
//!   their locals, resolved through the `locals` symbol table.
//! - `codegen` lowers the program into x86-64 Intel-syntax assembly.
//! - `error` centralises the caret diagnostics shared by the other modules.

pub mod codegen;
pub mod error;
pub mod locals;
pub mod parser;
pub mod tokenizer;

use std::io::Write;

pub use error::{CompileError, CompileResult};

/// Compile `source`, streaming the assembly into `out`.
pub fn compile<W: Write>(source: &str, out: &mut W) -> CompileResult<()> {
  let tokens = tokenizer::tokenize(source)?;
  let program = parser::parse(tokens, source)?;
  codegen::generate(&program, source, out)
}

/// Compile a source string into Intel-syntax assembly.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let mut out = Vec::new();
  compile(source, &mut out)?;
  Ok(String::from_utf8_lossy(&out).into_owned())
}
