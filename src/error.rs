//! Shared error utilities used across the compilation pipeline.
//!
//! Every located diagnostic echoes the source line that contains the
//! offending byte and places a caret underneath it, followed by the message.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
  /// A character the scanner does not recognise.
  #[snafu(display("{line}\n{marker} {message}"))]
  Lex {
    loc: usize,
    line: String,
    marker: String,
    message: String,
  },

  /// The token stream does not match the grammar.
  #[snafu(display("{line}\n{marker} {message}"))]
  Syntax {
    loc: usize,
    line: String,
    marker: String,
    message: String,
  },

  /// The left-hand side of an assignment has no address.
  #[snafu(display("{line}\n{marker} not an lvalue"))]
  NotLvalue {
    loc: usize,
    line: String,
    marker: String,
  },

  #[snafu(display("failed to write assembly: {source}"))]
  Emit { source: std::io::Error },
}

impl CompileError {
  /// Lexical error anchored at a byte offset in the source.
  pub fn lex(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (line, marker) = excerpt(source, loc);
    LexSnafu {
      loc,
      line,
      marker,
      message,
    }
    .build()
  }

  /// Syntax error anchored at a byte offset in the source.
  pub fn syntax(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (line, marker) = excerpt(source, loc);
    SyntaxSnafu {
      loc,
      line,
      marker,
      message,
    }
    .build()
  }

  pub fn not_lvalue(source: &str, loc: usize) -> Self {
    let (line, marker) = excerpt(source, loc);
    NotLvalueSnafu { loc, line, marker }.build()
  }

  /// Byte offset the diagnostic points at, if it has one.
  pub fn loc(&self) -> Option<usize> {
    match self {
      Self::Lex { loc, .. } | Self::Syntax { loc, .. } | Self::NotLvalue { loc, .. } => Some(*loc),
      Self::Emit { .. } => None,
    }
  }
}

/// Return the line holding `loc` and a caret marker aligned to its column.
fn excerpt(source: &str, loc: usize) -> (String, String) {
  let mut loc = loc.min(source.len());
  while !source.is_char_boundary(loc) {
    loc -= 1;
  }
  let start = source[..loc].rfind('\n').map_or(0, |i| i + 1);
  let end = source[loc..].find('\n').map_or(source.len(), |i| loc + i);
  let column = source[start..loc].chars().count();
  let marker = format!("{}^", " ".repeat(column));
  (source[start..end].to_string(), marker)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caret_sits_under_the_offending_byte() {
    let err = CompileError::syntax("1+;", 2, "expected an expression");
    assert_eq!(err.to_string(), "1+;\n  ^ expected an expression");
    assert_eq!(err.loc(), Some(2));
  }

  #[test]
  fn only_the_offending_line_is_echoed() {
    let src = "a=1;\nb=@;\nreturn a;";
    let err = CompileError::lex(src, 7, "invalid token: '@'");
    assert_eq!(err.to_string(), "b=@;\n  ^ invalid token: '@'");
  }

  #[test]
  fn offset_at_end_of_input_points_past_last_char() {
    let err = CompileError::syntax("1+2", 3, "expected \";\", but got \"EOF\"");
    assert_eq!(err.to_string(), "1+2\n   ^ expected \";\", but got \"EOF\"");
  }

  #[test]
  fn not_lvalue_has_a_fixed_message() {
    let err = CompileError::not_lvalue("1=2;", 0);
    assert_eq!(err.to_string(), "1=2;\n^ not an lvalue");
  }
}
