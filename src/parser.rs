//! Recursive-descent parser producing a statement list and expression AST.
//!
//! One helper per precedence level, lowest first:
//!
//! ```text
//! program    = stmt* EOF
//! stmt       = "return" expr ";" | expr ";"
//! expr       = assign
//! assign     = equality ("=" assign)?
//! equality   = relational ("==" relational | "!=" relational)*
//! relational = add ("<" add | "<=" add | ">" add | ">=" add)*
//! add        = mul ("+" mul | "-" mul)*
//! mul        = unary ("*" unary | "/" unary)*
//! unary      = ("+" | "-")? primary
//! primary    = "(" expr ")" | ident | num
//! ```

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::locals::Locals;
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};

/// Binary operators recognised by the language.
///
/// `>` and `>=` have no variant of their own: the parser swaps the operands
/// and emits `Lt`/`Le` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
  Num {
    value: i64,
  },
  /// Local variable, already resolved to its frame offset.
  Var {
    offset: i64,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<Node>,
    rhs: Box<Node>,
  },
  Assign {
    lhs: Box<Node>,
    rhs: Box<Node>,
  },
}

/// Expression tree node. `loc` is the byte offset of the token it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  pub kind: NodeKind,
  pub loc: usize,
}

impl Node {
  pub fn number(value: i64, loc: usize) -> Self {
    Self {
      kind: NodeKind::Num { value },
      loc,
    }
  }

  pub fn var(offset: i64, loc: usize) -> Self {
    Self {
      kind: NodeKind::Var { offset },
      loc,
    }
  }

  pub fn binary(op: BinaryOp, lhs: Node, rhs: Node, loc: usize) -> Self {
    Self {
      kind: NodeKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
      },
      loc,
    }
  }

  pub fn assign(lhs: Node, rhs: Node, loc: usize) -> Self {
    Self {
      kind: NodeKind::Assign {
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
      },
      loc,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
  /// Expression evaluated for its side effects; the value is discarded.
  Expr(Node),
  Return(Node),
}

/// A parsed compilation unit: top-level statements plus every local they use.
#[derive(Debug, Clone)]
pub struct Program {
  pub body: Vec<Stmt>,
  pub locals: Locals,
}

/// Parse a sequence of statements from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens, source);
  let mut body = Vec::new();

  while !stream.is_eof() {
    body.push(parse_stmt(&mut stream)?);
  }

  debug!(
    statements = body.len(),
    locals = stream.locals.len(),
    "parsed program"
  );

  Ok(Program {
    body,
    locals: stream.locals,
  })
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<Stmt> {
  if stream.equal("return") {
    let expr = parse_expr(stream)?;
    stream.skip(";")?;
    return Ok(Stmt::Return(expr));
  }

  let expr = parse_expr(stream)?;
  stream.skip(";")?;
  Ok(Stmt::Expr(expr))
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<Node> {
  parse_assign(stream)
}

fn parse_assign(stream: &mut TokenStream) -> CompileResult<Node> {
  let node = parse_equality(stream)?;

  let loc = stream.loc();
  if stream.equal("=") {
    // Whether `node` can be assigned to is checked during codegen.
    let rhs = parse_assign(stream)?;
    return Ok(Node::assign(node, rhs, loc));
  }

  Ok(node)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<Node> {
  let mut node = parse_relational(stream)?;

  loop {
    let loc = stream.loc();
    let op = match stream.peek_reserved() {
      Some("==") => BinaryOp::Eq,
      Some("!=") => BinaryOp::Ne,
      _ => break,
    };

    stream.advance();
    let rhs = parse_relational(stream)?;
    node = Node::binary(op, node, rhs, loc);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<Node> {
  let mut node = parse_add(stream)?;

  loop {
    let loc = stream.loc();
    let (op, swapped) = match stream.peek_reserved() {
      Some("<") => (BinaryOp::Lt, false),
      Some("<=") => (BinaryOp::Le, false),
      Some(">") => (BinaryOp::Lt, true),
      Some(">=") => (BinaryOp::Le, true),
      _ => break,
    };

    stream.advance();
    let rhs = parse_add(stream)?;
    node = if swapped {
      Node::binary(op, rhs, node, loc)
    } else {
      Node::binary(op, node, rhs, loc)
    };
  }

  Ok(node)
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<Node> {
  let mut node = parse_mul(stream)?;

  loop {
    let loc = stream.loc();
    let op = match stream.peek_reserved() {
      Some("+") => BinaryOp::Add,
      Some("-") => BinaryOp::Sub,
      _ => break,
    };

    stream.advance();
    let rhs = parse_mul(stream)?;
    node = Node::binary(op, node, rhs, loc);
  }

  Ok(node)
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<Node> {
  let mut node = parse_unary(stream)?;

  loop {
    let loc = stream.loc();
    let op = match stream.peek_reserved() {
      Some("*") => BinaryOp::Mul,
      Some("/") => BinaryOp::Div,
      _ => break,
    };

    stream.advance();
    let rhs = parse_unary(stream)?;
    node = Node::binary(op, node, rhs, loc);
  }

  Ok(node)
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<Node> {
  if stream.equal("+") {
    return parse_unary(stream);
  }

  let loc = stream.loc();
  if stream.equal("-") {
    let operand = parse_unary(stream)?;
    return Ok(Node::binary(
      BinaryOp::Sub,
      Node::number(0, loc),
      operand,
      loc,
    ));
  }

  parse_primary(stream)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<Node> {
  if stream.equal("(") {
    let node = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(node);
  }

  if let Some((name, loc)) = stream.consume_ident() {
    // Variables are single letters; the rest of the identifier is ignored.
    let offset = stream.locals.resolve(&name[..1]);
    return Ok(Node::var(offset, loc));
  }

  let (value, loc) = stream.get_number()?;
  Ok(Node::number(value, loc))
}

/// Cursor over the token vector, plus the locals discovered so far.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
  locals: Locals,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
      locals: Locals::new(),
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// Text of the current token if it is a punctuator or keyword.
  fn peek_reserved(&self) -> Option<&'a str> {
    self
      .peek()
      .filter(|token| token.kind == TokenKind::Reserved)
      .map(|token| token_text(token, self.source))
  }

  /// Byte offset of the current token, or end of input.
  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  fn advance(&mut self) {
    if self.pos < self.tokens.len() {
      self.pos += 1;
    }
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if self.peek_reserved() == Some(op) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      return Ok(());
    }
    let got = describe_token(self.peek(), self.source);
    Err(CompileError::syntax(
      self.source,
      self.loc(),
      format!("expected \"{s}\", but got \"{got}\""),
    ))
  }

  /// Consume an identifier, returning its name and location.
  fn consume_ident(&mut self) -> Option<(&'a str, usize)> {
    let token = self.peek().filter(|token| token.kind == TokenKind::Ident)?;
    let ident = (token_text(token, self.source), token.loc);
    self.pos += 1;
    Some(ident)
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i64, usize)> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Num
    {
      let value = token.value.ok_or_else(|| {
        CompileError::syntax(
          self.source,
          token.loc,
          "internal error: numeric token missing value",
        )
      })?;
      let loc = token.loc;
      self.pos += 1;
      return Ok((value, loc));
    }

    let got = describe_token(self.peek(), self.source);
    Err(CompileError::syntax(
      self.source,
      self.loc(),
      format!("expected an expression, but got \"{got}\""),
    ))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof) | None)
  }
}
