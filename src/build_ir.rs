//! Lowering the typed AST to the linear IR.
//!
//! Frame layout happens first: every local gets an offset below `fp`,
//! assigned in declaration order starting past the saved frame pointer,
//! and the frame is rounded up to 16 bytes so `sp` stays 8-byte aligned at
//! call boundaries. Expression lowering uses a single accumulator: a value
//! is computed into `r0`; binary operators evaluate the right operand
//! first, park it on the machine stack, evaluate the left operand, then
//! pop the right into `r1`. The push/pop balance is tracked and must
//! return to zero at every statement boundary.

use arrayvec::ArrayVec;

use crate::CompileError;
use crate::types::ast::{BinOp, Expr, ExprKind, FnDef, Program, Stmt, StmtKind};
use crate::types::ir::{Cond, Inst, Ir, Label};
use crate::types::ty::TyKind;
use crate::types::{PTR_SIZE, align_to};
use crate::symbol::Symbol;

/// Lower a parsed program. Functions are lowered in source order; global
/// variables become storage reservations.
pub fn lower(prog: &Program<'_>) -> Result<Ir, CompileError> {
  let mut funcs = Vec::new();
  let mut globals = Vec::new();
  for obj in &prog.decls {
    match &obj.def {
      Some(def) => {
        assign_offsets(def);
        funcs.push(obj.name);
      }
      // A declarator can give a global a function type without defining
      // it; such a name gets no storage.
      None if matches!(*obj.ty, TyKind::Func { .. }) => {}
      None => globals.push((obj.name, obj.ty.size())),
    }
  }

  let mut ctx = Lower { insts: Vec::new(), depth: 0, count: 0, cur: None, uses_div: false };
  for obj in &prog.decls {
    if let Some(def) = &obj.def {
      ctx.gen_fn(obj.name, def)?;
    }
  }

  Ok(Ir { funcs, globals, insts: ctx.insts, uses_div: ctx.uses_div })
}

/// Assign frame offsets to every local and fix the frame size.
///
/// Offsets start just past the saved frame pointer and grow downward in
/// declaration order, so `[fp, #-offset]` stays inside the frame.
fn assign_offsets(def: &FnDef<'_>) {
  let mut offset = PTR_SIZE;
  for local in def.locals {
    offset += local.ty.size();
    local.offset.set(offset);
  }
  def.stack_size.set(align_to(offset, 16));
}

struct Lower {
  insts: Vec<Inst>,
  /// Push/pop balance; zero at every statement boundary.
  depth: u32,
  /// Branch-label counter, monotonic across the whole compilation so
  /// labels stay unique between functions.
  count: u32,
  cur: Option<Symbol>,
  uses_div: bool,
}

impl Lower {
  fn emit(&mut self, inst: Inst) {
    self.insts.push(inst);
  }

  fn cur(&self) -> Symbol {
    self.cur.expect("label outside a function")
  }

  fn next_count(&mut self) -> u32 {
    self.count += 1;
    self.count
  }

  fn push(&mut self) {
    self.emit(Inst::Push);
    self.depth += 1;
  }

  fn pop(&mut self, reg: u8) {
    self.emit(Inst::Pop { reg });
    self.depth -= 1;
  }

  fn gen_fn(&mut self, name: Symbol, def: &FnDef<'_>) -> Result<(), CompileError> {
    self.cur = Some(name);
    self.emit(Inst::Label(Label::Fn(name)));
    self.emit(Inst::Prologue { frame: def.stack_size.get() });

    // Register arguments land in their parameter slots before the body
    // can mention them.
    for (i, param) in def.params.iter().enumerate() {
      self.emit(Inst::StoreArg { reg: i as u8, offset: param.offset.get() });
    }

    self.gen_stmt(def.body)?;
    assert_eq!(self.depth, 0, "unbalanced temporary stack");

    self.emit(Inst::Label(Label::Return(name)));
    self.emit(Inst::Epilogue);
    Ok(())
  }

  fn gen_stmt(&mut self, stmt: &Stmt<'_>) -> Result<(), CompileError> {
    match stmt.kind {
      StmtKind::Expr(e) => self.gen_expr(e),
      StmtKind::Return(e) => {
        self.gen_expr(e)?;
        self.emit(Inst::Branch(Label::Return(self.cur())));
        Ok(())
      }
      StmtKind::Block(body) => {
        for &stmt in body {
          self.gen_stmt(stmt)?;
          assert_eq!(self.depth, 0, "unbalanced temporary stack");
        }
        Ok(())
      }
      StmtKind::If { cond, then, els } => {
        let c = self.next_count();
        let f = self.cur();
        self.gen_expr(cond)?;
        self.emit(Inst::BranchZero(Label::IfElse(f, c)));
        self.gen_stmt(then)?;
        self.emit(Inst::Branch(Label::IfEnd(f, c)));
        self.emit(Inst::Label(Label::IfElse(f, c)));
        if let Some(els) = els {
          self.gen_stmt(els)?;
        }
        self.emit(Inst::Label(Label::IfEnd(f, c)));
        Ok(())
      }
      StmtKind::Loop { init, cond, step, body } => {
        let c = self.next_count();
        let f = self.cur();
        if let Some(init) = init {
          self.gen_stmt(init)?;
        }
        self.emit(Inst::Label(Label::LoopBegin(f, c)));
        if let Some(cond) = cond {
          self.gen_expr(cond)?;
          self.emit(Inst::BranchZero(Label::LoopEnd(f, c)));
        }
        self.gen_stmt(body)?;
        if let Some(step) = step {
          self.gen_expr(step)?;
        }
        self.emit(Inst::Branch(Label::LoopBegin(f, c)));
        self.emit(Inst::Label(Label::LoopEnd(f, c)));
        Ok(())
      }
    }
  }

  /// Compute the address denoted by an lvalue into `r0`.
  fn gen_addr(&mut self, e: &Expr<'_>) -> Result<(), CompileError> {
    match e.kind {
      ExprKind::Var(obj) => {
        if obj.is_local() {
          self.emit(Inst::LocalAddr { offset: obj.offset.get() });
        } else {
          self.emit(Inst::GlobalAddr { name: obj.name });
        }
        Ok(())
      }
      ExprKind::Deref(operand) => self.gen_expr(operand),
      _ => Err(CompileError::codegen(e.loc, "not an lvalue")),
    }
  }

  /// Load the value at the address in `r0`, unless the value is an array:
  /// an array's address *is* its value (decay to a pointer to the first
  /// element).
  fn load(&mut self, e: &Expr<'_>) {
    let ty = e.ty.get().expect("expression was elaborated");
    if matches!(*ty, TyKind::Array(..)) {
      return;
    }
    self.emit(Inst::Load);
  }

  /// Evaluate an expression into `r0`.
  fn gen_expr(&mut self, e: &Expr<'_>) -> Result<(), CompileError> {
    match e.kind {
      ExprKind::Num(val) => {
        self.emit(Inst::MovImm { imm: val });
        Ok(())
      }
      ExprKind::Neg(operand) => {
        self.gen_expr(operand)?;
        self.emit(Inst::Neg);
        Ok(())
      }
      ExprKind::Var(_) => {
        self.gen_addr(e)?;
        self.load(e);
        Ok(())
      }
      ExprKind::Addr(operand) => self.gen_addr(operand),
      ExprKind::Deref(operand) => {
        self.gen_expr(operand)?;
        self.load(e);
        Ok(())
      }
      ExprKind::Assign(lhs, rhs) => {
        self.gen_addr(lhs)?;
        self.push();
        self.gen_expr(rhs)?;
        self.pop(1);
        self.emit(Inst::Store);
        Ok(())
      }
      ExprKind::Call(name, args) => {
        // One slot per argument register; the parser rejected anything
        // past four, so the pushes cannot overflow.
        let mut regs: ArrayVec<u8, 4> = ArrayVec::new();
        for (i, &arg) in args.iter().enumerate() {
          self.gen_expr(arg)?;
          self.push();
          regs.push(i as u8);
        }
        while let Some(reg) = regs.pop() {
          self.pop(reg);
        }
        self.emit(Inst::Call(name));
        Ok(())
      }
      ExprKind::Binary(op, lhs, rhs) => {
        self.gen_expr(rhs)?;
        self.push();
        self.gen_expr(lhs)?;
        self.pop(1);
        match op {
          BinOp::Add => self.emit(Inst::Add),
          BinOp::Sub => self.emit(Inst::Sub),
          BinOp::Mul => self.emit(Inst::Mul),
          BinOp::Div => {
            self.uses_div = true;
            self.emit(Inst::Div);
          }
          BinOp::Eq => self.emit(Inst::Cmp(Cond::Eq)),
          BinOp::Ne => self.emit(Inst::Cmp(Cond::Ne)),
          BinOp::Lt => self.emit(Inst::Cmp(Cond::Lt)),
          BinOp::Le => self.emit(Inst::Cmp(Cond::Le)),
        }
        Ok(())
      }
    }
  }
}
