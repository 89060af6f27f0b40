//! The abstract syntax tree.
//!
//! Expressions and statements are separate sum types; the original
//! kind-enum plus optional-field bag becomes one variant per shape, so a
//! node cannot carry fields that its kind never uses. All nodes are
//! arena-allocated and linked by shared references; sibling sequences are
//! arena slices.

use std::cell::Cell;

use bitflags::bitflags;

use crate::symbol::{Interner, Symbol};

use super::ty::Ty;

/// Binary operators surviving to the AST. `>` and `>=` are normalized away
/// by the parser (operand swap around `<` / `<=`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
}

/// An expression. `ty` is empty until the elaborator fills it; every
/// expression in a parsed program ends up typed because elaboration runs
/// at each block-level statement.
#[derive(Debug)]
pub struct Expr<'a> {
  pub kind: ExprKind<'a>,
  /// Byte offset of the representative token, for diagnostics.
  pub loc: u32,
  pub ty: Cell<Option<Ty<'a>>>,
}

#[derive(Debug)]
pub enum ExprKind<'a> {
  /// Integer literal.
  Num(i32),
  /// Reference to a resolved variable.
  Var(&'a Obj<'a>),
  /// Unary minus.
  Neg(&'a Expr<'a>),
  /// Unary `&`.
  Addr(&'a Expr<'a>),
  /// Unary `*`.
  Deref(&'a Expr<'a>),
  Binary(BinOp, &'a Expr<'a>, &'a Expr<'a>),
  /// `lhs = rhs`; the lhs is always a `Var` or `Deref`.
  Assign(&'a Expr<'a>, &'a Expr<'a>),
  /// Call by name. Arity is at most the four argument registers.
  Call(Symbol, &'a [&'a Expr<'a>]),
}

/// A statement. Statements are never typed.
#[derive(Debug)]
pub struct Stmt<'a> {
  pub kind: StmtKind<'a>,
  pub loc: u32,
}

#[derive(Debug)]
pub enum StmtKind<'a> {
  Expr(&'a Expr<'a>),
  Return(&'a Expr<'a>),
  Block(&'a [&'a Stmt<'a>]),
  If { cond: &'a Expr<'a>, then: &'a Stmt<'a>, els: Option<&'a Stmt<'a>> },
  /// Both `for` and `while`; `while` leaves `init` and `step` empty.
  Loop {
    init: Option<&'a Stmt<'a>>,
    cond: Option<&'a Expr<'a>>,
    step: Option<&'a Expr<'a>>,
    body: &'a Stmt<'a>,
  },
}

bitflags! {
  /// Attributes of a declared object.
  #[derive(Clone, Copy, Debug, PartialEq, Eq)]
  pub struct ObjAttr: u8 {
    /// Declared inside a function body, including parameters.
    const LOCAL = 1;
    /// Names a function definition.
    const FUNCTION = 1 << 1;
  }
}

/// A declared object: a variable or a function.
#[derive(Debug)]
pub struct Obj<'a> {
  pub name: Symbol,
  pub ty: Ty<'a>,
  pub attr: ObjAttr,
  /// Stack-frame offset below `fp`, in bytes. Assigned exactly once by the
  /// IR builder before any reference to the local is emitted.
  pub offset: Cell<u32>,
  /// Present iff `attr` contains [`ObjAttr::FUNCTION`].
  pub def: Option<FnDef<'a>>,
}

impl Obj<'_> {
  #[must_use]
  pub fn is_local(&self) -> bool {
    self.attr.contains(ObjAttr::LOCAL)
  }

  #[must_use]
  pub fn is_function(&self) -> bool {
    self.attr.contains(ObjAttr::FUNCTION)
  }
}

/// The body and frame data of a function definition.
#[derive(Debug)]
pub struct FnDef<'a> {
  /// Parameters in declared order; the leading prefix of `locals`.
  pub params: &'a [&'a Obj<'a>],
  /// Every local in declaration order, parameters first.
  pub locals: &'a [&'a Obj<'a>],
  /// The function body; always a block.
  pub body: &'a Stmt<'a>,
  /// Total frame size, 16-byte aligned. Assigned by the IR builder.
  pub stack_size: Cell<u32>,
}

/// A parsed translation unit: top-level declarations in source order plus
/// the symbol table they intern into.
#[derive(Debug)]
pub struct Program<'a> {
  pub decls: Vec<&'a Obj<'a>>,
  pub syms: Interner<'a>,
}
