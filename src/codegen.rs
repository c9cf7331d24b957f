//! Code generation: lower the parsed program into Intel-syntax x86-64 assembly.
//!
//! The emitter is a simple stack machine: every expression leaves a single
//! value on the stack and each statement pops it again. Locals live in one
//! fixed frame and are addressed relative to `rbp`.

use std::fmt::Display;
use std::io::Write;

use snafu::ResultExt;
use tracing::debug;

use crate::error::{CompileError, CompileResult, EmitSnafu};
use crate::parser::{BinaryOp, Node, NodeKind, Program, Stmt};

/// Label every `return` jumps to.
const RETURN_LABEL: &str = ".L.return";

/// System V requires `rsp` to be 16-byte aligned at call boundaries.
const STACK_ALIGN: i64 = 16;

/// Round `n` up to the nearest multiple of `align`.
pub fn align_to(n: i64, align: i64) -> i64 {
  (n + align - 1) / align * align
}

/// Emit assembly for a program. Output already written stays written when a
/// later statement fails.
pub fn generate<W: Write>(program: &Program, source: &str, out: &mut W) -> CompileResult<()> {
  let stack_size = align_to(program.locals.frame_size(), STACK_ALIGN);
  debug!(locals = program.locals.len(), stack_size, "emitting main");

  let mut emitter = Emitter { out, source };
  emitter.raw(".intel_syntax noprefix")?;
  emitter.raw(".global main")?;
  emitter.raw("main:")?;

  emitter.ins("push rbp")?;
  emitter.ins("mov rbp, rsp")?;
  if stack_size > 0 {
    emitter.ins(format_args!("sub rsp, {stack_size}"))?;
  }

  for stmt in &program.body {
    emitter.emit_stmt(stmt)?;
  }

  emitter.raw(format_args!("{RETURN_LABEL}:"))?;
  emitter.ins("mov rsp, rbp")?;
  emitter.ins("pop rbp")?;
  emitter.ins("ret")?;
  emitter.out.flush().context(EmitSnafu)
}

struct Emitter<'a, W> {
  out: &'a mut W,
  source: &'a str,
}

impl<W: Write> Emitter<'_, W> {
  /// Write a line as-is (directives and labels).
  fn raw(&mut self, line: impl Display) -> CompileResult<()> {
    writeln!(self.out, "{line}").context(EmitSnafu)
  }

  /// Write an indented instruction.
  fn ins(&mut self, line: impl Display) -> CompileResult<()> {
    writeln!(self.out, "  {line}").context(EmitSnafu)
  }

  fn emit_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
    match stmt {
      Stmt::Expr(node) => {
        self.emit_expr(node)?;
        // Discard the statement's value to keep the stack balanced.
        self.ins("pop rax")
      }
      Stmt::Return(node) => {
        self.emit_expr(node)?;
        self.ins("pop rax")?;
        self.ins(format_args!("jmp {RETURN_LABEL}"))
      }
    }
  }

  /// Emit stack-based code for a single expression node.
  fn emit_expr(&mut self, node: &Node) -> CompileResult<()> {
    match &node.kind {
      NodeKind::Num { value } => {
        self.ins(format_args!("mov rax, {value}"))?;
        self.ins("push rax")
      }
      NodeKind::Var { .. } => {
        self.emit_addr(node)?;
        self.ins("pop rax")?;
        self.ins("mov rax, [rax]")?;
        self.ins("push rax")
      }
      NodeKind::Assign { lhs, rhs } => {
        self.emit_addr(lhs)?;
        self.emit_expr(rhs)?;
        self.ins("pop rdi")?;
        self.ins("pop rax")?;
        self.ins("mov [rax], rdi")?;
        self.ins("push rdi")
      }
      NodeKind::Binary { op, lhs, rhs } => {
        self.emit_expr(lhs)?;
        self.emit_expr(rhs)?;
        self.ins("pop rdi")?;
        self.ins("pop rax")?;
        match op {
          BinaryOp::Add => self.ins("add rax, rdi")?,
          BinaryOp::Sub => self.ins("sub rax, rdi")?,
          BinaryOp::Mul => self.ins("imul rax, rdi")?,
          BinaryOp::Div => {
            self.ins("cqo")?;
            self.ins("idiv rdi")?;
          }
          BinaryOp::Eq => self.emit_compare("sete")?,
          BinaryOp::Ne => self.emit_compare("setne")?,
          BinaryOp::Lt => self.emit_compare("setl")?,
          BinaryOp::Le => self.emit_compare("setle")?,
        }
        self.ins("push rax")
      }
    }
  }

  /// `rax = (rax <cc> rdi) as 0/1`.
  fn emit_compare(&mut self, set: &str) -> CompileResult<()> {
    self.ins("cmp rax, rdi")?;
    self.ins(format_args!("{set} al"))?;
    self.ins("movzx rax, al")
  }

  /// Push the address of an lvalue.
  fn emit_addr(&mut self, node: &Node) -> CompileResult<()> {
    match node.kind {
      NodeKind::Var { offset } => {
        self.ins("mov rax, rbp")?;
        self.ins(format_args!("sub rax, {offset}"))?;
        self.ins("push rax")
      }
      _ => Err(CompileError::not_lvalue(self.source, node.loc)),
    }
  }
}
