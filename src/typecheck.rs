//! Type elaboration.
//!
//! [`add_type`] fills the `ty` field of an expression tree bottom-up and is
//! a no-op on already-typed nodes, so the parser can call it eagerly while
//! rewriting pointer arithmetic and again at every block-level statement.
//! Two rules do real work: taking the address of an array yields a pointer
//! to its element type (decay), and dereferencing anything without a base
//! type is rejected.

use crate::arena::Arena;
use crate::types::ast::{BinOp, Expr, ExprKind, Stmt, StmtKind};
use crate::types::ty::{TY_INT, TyKind};
use crate::CompileError;

/// Annotate `e` and its subexpressions with types.
pub fn add_type<'a>(arena: &'a Arena, e: &'a Expr<'a>) -> Result<(), CompileError> {
  if e.ty.get().is_some() {
    return Ok(());
  }

  match e.kind {
    ExprKind::Num(_) => e.ty.set(Some(TY_INT)),
    ExprKind::Var(obj) => e.ty.set(Some(obj.ty)),
    ExprKind::Neg(operand) => {
      add_type(arena, operand)?;
      e.ty.set(operand.ty.get());
    }
    ExprKind::Binary(op, lhs, rhs) => {
      add_type(arena, lhs)?;
      add_type(arena, rhs)?;
      match op {
        // Pointer cases were already adjusted by the parser, so the
        // arithmetic result type is simply the lhs type.
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => e.ty.set(lhs.ty.get()),
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le => e.ty.set(Some(TY_INT)),
      }
    }
    ExprKind::Assign(lhs, rhs) => {
      add_type(arena, lhs)?;
      add_type(arena, rhs)?;
      let lty = lhs.ty.get().expect("lhs was elaborated");
      if matches!(*lty, TyKind::Array(..)) {
        return Err(CompileError::ty(e.loc, "not an lvalue"));
      }
      e.ty.set(Some(lty));
    }
    ExprKind::Addr(operand) => {
      add_type(arena, operand)?;
      let ty = operand.ty.get().expect("operand was elaborated");
      // Taking the address of an array gives a pointer to its first
      // element, not a pointer to the array.
      let pointee = match *ty {
        TyKind::Array(base, _) => base,
        _ => ty,
      };
      e.ty.set(Some(arena.alloc(TyKind::Ptr(pointee))));
    }
    ExprKind::Deref(operand) => {
      add_type(arena, operand)?;
      let ty = operand.ty.get().expect("operand was elaborated");
      match ty.base() {
        Some(base) => e.ty.set(Some(base)),
        None => return Err(CompileError::ty(e.loc, "invalid pointer dereference")),
      }
    }
    ExprKind::Call(_, args) => {
      for &arg in args {
        add_type(arena, arg)?;
      }
      e.ty.set(Some(TY_INT));
    }
  }
  Ok(())
}

/// Elaborate every expression contained in a statement.
pub fn check_stmt<'a>(arena: &'a Arena, s: &'a Stmt<'a>) -> Result<(), CompileError> {
  match s.kind {
    StmtKind::Expr(e) | StmtKind::Return(e) => add_type(arena, e),
    StmtKind::Block(body) => {
      for &s in body {
        check_stmt(arena, s)?;
      }
      Ok(())
    }
    StmtKind::If { cond, then, els } => {
      add_type(arena, cond)?;
      check_stmt(arena, then)?;
      if let Some(els) = els {
        check_stmt(arena, els)?;
      }
      Ok(())
    }
    StmtKind::Loop { init, cond, step, body } => {
      if let Some(init) = init {
        check_stmt(arena, init)?;
      }
      if let Some(cond) = cond {
        add_type(arena, cond)?;
      }
      if let Some(step) = step {
        add_type(arena, step)?;
      }
      check_stmt(arena, body)
    }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;
  use crate::symbol::Interner;
  use crate::types::ast::{Obj, ObjAttr};
  use crate::types::ty::Ty;

  fn expr<'a>(arena: &'a Arena, kind: ExprKind<'a>) -> &'a Expr<'a> {
    arena.alloc(Expr { kind, loc: 0, ty: Cell::new(None) })
  }

  fn local<'a>(arena: &'a Arena, name: &str, ty: Ty<'a>) -> &'a Obj<'a> {
    let mut syms = Interner::new(arena);
    arena.alloc(Obj {
      name: syms.intern(name),
      ty,
      attr: ObjAttr::LOCAL,
      offset: Cell::new(0),
      def: None,
    })
  }

  #[test]
  fn addr_of_array_decays_to_element_pointer() {
    let arena = Arena::new();
    let arr_ty = arena.alloc(TyKind::Array(TY_INT, 3));
    let var = expr(&arena, ExprKind::Var(local(&arena, "a", arr_ty)));
    let addr = expr(&arena, ExprKind::Addr(var));
    add_type(&arena, addr).unwrap();
    assert_eq!(*addr.ty.get().unwrap(), TyKind::Ptr(TY_INT));
  }

  #[test]
  fn deref_of_int_is_rejected() {
    let arena = Arena::new();
    let var = expr(&arena, ExprKind::Var(local(&arena, "x", TY_INT)));
    let deref = expr(&arena, ExprKind::Deref(var));
    let err = add_type(&arena, deref).unwrap_err();
    assert_eq!(err.msg, "invalid pointer dereference");
  }

  #[test]
  fn deref_of_array_yields_element() {
    let arena = Arena::new();
    let arr_ty = arena.alloc(TyKind::Array(TY_INT, 2));
    let var = expr(&arena, ExprKind::Var(local(&arena, "a", arr_ty)));
    let deref = expr(&arena, ExprKind::Deref(var));
    add_type(&arena, deref).unwrap();
    assert_eq!(deref.ty.get().unwrap(), TY_INT);
  }

  #[test]
  fn assigning_into_array_is_rejected() {
    let arena = Arena::new();
    let arr_ty = arena.alloc(TyKind::Array(TY_INT, 2));
    let var = expr(&arena, ExprKind::Var(local(&arena, "a", arr_ty)));
    let zero = expr(&arena, ExprKind::Num(0));
    let assign = expr(&arena, ExprKind::Assign(var, zero));
    let err = add_type(&arena, assign).unwrap_err();
    assert_eq!(err.msg, "not an lvalue");
  }

  #[test]
  fn comparisons_are_int() {
    let arena = Arena::new();
    let lhs = expr(&arena, ExprKind::Num(1));
    let rhs = expr(&arena, ExprKind::Num(2));
    let cmp = expr(&arena, ExprKind::Binary(BinOp::Lt, lhs, rhs));
    add_type(&arena, cmp).unwrap();
    assert_eq!(cmp.ty.get().unwrap(), TY_INT);
  }
}
