//! charmcc: a single-pass compiler from a small C subset to 32-bit ARM
//! assembly.
//!
//! The pipeline is `tokenize` → [`parser::parse`] (which elaborates types
//! inline, one block-level statement at a time) → [`build_ir::lower`] →
//! [`codegen::emit`]. Every AST node, type, and object lives in a single
//! [`arena::Arena`] scoped to the compilation. The generated assembly
//! targets the 32-bit ARM calling convention with `r0`–`r3` argument
//! registers and `fp`/`sp`/`lr`/`pc` frame conventions, and is meant to be
//! assembled against a runtime that provides the `main` entry point.

use std::fmt;

pub mod arena;
pub mod build_ir;
pub mod codegen;
pub mod debug;
pub mod lexer;
pub mod parser;
pub mod symbol;
pub mod typecheck;
pub mod types;

use arena::Arena;

/// Which stage rejected the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
  /// An unrecognized byte in the source.
  Lex,
  /// A malformed construct or an unresolved identifier.
  Parse,
  /// A type rule violation.
  Type,
  /// A structurally invalid node reached the code generator. Unreachable
  /// when elaboration is correct.
  Codegen,
}

/// A fatal diagnostic. Compilation stops at the first error; there is no
/// recovery mode.
#[derive(Debug)]
pub struct CompileError {
  pub class: ErrorClass,
  /// Byte offset of the offending token, when known.
  pub loc: Option<u32>,
  pub msg: String,
}

impl CompileError {
  pub(crate) fn lex(loc: u32, msg: impl Into<String>) -> Self {
    Self { class: ErrorClass::Lex, loc: Some(loc), msg: msg.into() }
  }

  pub(crate) fn parse(loc: u32, msg: impl Into<String>) -> Self {
    Self { class: ErrorClass::Parse, loc: Some(loc), msg: msg.into() }
  }

  pub(crate) fn ty(loc: u32, msg: impl Into<String>) -> Self {
    Self { class: ErrorClass::Type, loc: Some(loc), msg: msg.into() }
  }

  pub(crate) fn codegen(loc: u32, msg: impl Into<String>) -> Self {
    Self { class: ErrorClass::Codegen, loc: Some(loc), msg: msg.into() }
  }

  /// Render the diagnostic against the source: the offending line, then a
  /// caret under the offending byte.
  #[must_use]
  pub fn render(&self, src: &str) -> String {
    let Some(loc) = self.loc else {
      return self.msg.clone();
    };
    let bytes = src.as_bytes();
    let loc = (loc as usize).min(bytes.len());
    let start = bytes[..loc].iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    let end = bytes[loc..].iter().position(|&b| b == b'\n').map_or(bytes.len(), |i| loc + i);
    let line = String::from_utf8_lossy(&bytes[start..end]);
    format!("{line}\n{:pad$}^ {}", "", self.msg, pad = loc - start)
  }
}

impl fmt::Display for CompileError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.loc {
      Some(loc) => write!(f, "{}: {}", loc, self.msg),
      None => write!(f, "{}", self.msg),
    }
  }
}

impl std::error::Error for CompileError {}

/// Compile `src` to ARM assembly text.
pub fn compile(src: &str) -> Result<String, CompileError> {
  let arena = Arena::new();
  let toks = lexer::tokenize(src)?;
  let prog = parser::parse(&arena, src, &toks)?;
  let ir = build_ir::lower(&prog)?;
  let mut out = Vec::new();
  codegen::emit(&ir, &prog.syms, &mut out).expect("writes to a Vec cannot fail");
  Ok(String::from_utf8(out).expect("emitted assembly is ASCII"))
}

/// Compile `src` and render the AST and IR dumps instead of assembly.
pub fn debug_dump(src: &str) -> Result<String, CompileError> {
  let arena = Arena::new();
  let toks = lexer::tokenize(src)?;
  let prog = parser::parse(&arena, src, &toks)?;
  let ir = build_ir::lower(&prog)?;
  let mut out = Vec::new();
  debug::dump(&prog, &ir, &mut out).expect("writes to a Vec cannot fail");
  Ok(String::from_utf8(out).expect("dump output is ASCII"))
}
