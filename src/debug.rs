//! Human-readable dumps of the AST and the IR, behind the `--debug` flag.
//!
//! The AST prints as an s-expression per function; the pretty-form is
//! canonical, so two syntactically equivalent inputs produce identical
//! dumps. The IR prints one line per instruction. Neither form re-parses.

use std::io::{self, Write};

use itertools::Itertools;

use crate::symbol::Interner;
use crate::types::ast::{BinOp, Expr, ExprKind, FnDef, Obj, Program, Stmt, StmtKind};
use crate::types::ir::{Cond, Inst, Ir};
use crate::types::ty::TyKind;

/// Write the AST and IR dumps for a whole program.
pub fn dump(prog: &Program<'_>, ir: &Ir, w: &mut impl Write) -> io::Result<()> {
  for &obj in &prog.decls {
    if let Some(def) = &obj.def {
      dump_fn(w, &prog.syms, obj, def)?;
    }
  }
  writeln!(w)?;
  dump_ir(w, &prog.syms, ir)
}

fn dump_fn(
  w: &mut impl Write,
  syms: &Interner<'_>,
  obj: &Obj<'_>,
  def: &FnDef<'_>,
) -> io::Result<()> {
  let name = syms.name(obj.name);
  if !def.locals.is_empty() {
    let locals = def
      .locals
      .iter()
      .format_with("", |local, f| f(&format_args!("  {}", syms.name(local.name))));
    writeln!(w, "{name} local variables:{locals}")?;
  }
  writeln!(w, "{name} :: {}", render_stmt(syms, def.body))
}

fn op_text(op: BinOp) -> &'static str {
  match op {
    BinOp::Add => "+",
    BinOp::Sub => "-",
    BinOp::Mul => "*",
    BinOp::Div => "/",
    BinOp::Eq => "==",
    BinOp::Ne => "!=",
    BinOp::Lt => "<",
    BinOp::Le => "<=",
  }
}

/// Pointer depth markers for a variable reference: one `*` per level.
fn ty_prefix(ty: &TyKind<'_>) -> String {
  match *ty {
    TyKind::Ptr(base) => format!("*{}", ty_prefix(base)),
    _ => String::new(),
  }
}

fn render_expr(syms: &Interner<'_>, e: &Expr<'_>) -> String {
  match e.kind {
    ExprKind::Num(val) => val.to_string(),
    ExprKind::Var(obj) => format!("{}{}", ty_prefix(obj.ty), syms.name(obj.name)),
    ExprKind::Neg(x) => format!("(- {})", render_expr(syms, x)),
    ExprKind::Addr(x) => format!("(addr {})", render_expr(syms, x)),
    ExprKind::Deref(x) => format!("(deref {})", render_expr(syms, x)),
    ExprKind::Binary(op, lhs, rhs) => {
      format!("({} {}, {})", op_text(op), render_expr(syms, lhs), render_expr(syms, rhs))
    }
    ExprKind::Assign(lhs, rhs) => {
      format!("(let {} {})", render_expr(syms, lhs), render_expr(syms, rhs))
    }
    ExprKind::Call(name, args) => format!(
      "(call {}{})",
      syms.name(name),
      args.iter().format_with("", |&arg, f| f(&format_args!(" {}", render_expr(syms, arg))))
    ),
  }
}

fn render_stmt(syms: &Interner<'_>, s: &Stmt<'_>) -> String {
  match s.kind {
    StmtKind::Expr(e) => format!("{}; ", render_expr(syms, e)),
    StmtKind::Return(e) => format!("(return {})", render_expr(syms, e)),
    StmtKind::Block(body) => {
      format!("{{ {} }}", body.iter().map(|&s| render_stmt(syms, s)).join(""))
    }
    StmtKind::If { cond, then, els } => {
      let mut out = format!("(if {} {}", render_expr(syms, cond), render_stmt(syms, then));
      if let Some(els) = els {
        out.push_str(&format!(" : {}", render_stmt(syms, els)));
      }
      out.push_str("); ");
      out
    }
    StmtKind::Loop { init, cond, step, body } => {
      let mut out = String::from("(loop");
      if let Some(init) = init {
        out.push_str(&format!(" {}", render_stmt(syms, init)));
      }
      if let Some(cond) = cond {
        out.push_str(&format!(" {}", render_expr(syms, cond)));
      }
      if let Some(step) = step {
        out.push_str(&format!(" {}", render_expr(syms, step)));
      }
      out.push_str(&format!(" {}); ", render_stmt(syms, body)));
      out
    }
  }
}

fn dump_ir(w: &mut impl Write, syms: &Interner<'_>, ir: &Ir) -> io::Result<()> {
  for &(name, size) in &ir.globals {
    writeln!(w, ".global var {} [{size}]", syms.name(name))?;
  }
  for &f in &ir.funcs {
    writeln!(w, ".global fn {}", syms.name(f))?;
  }

  for inst in &ir.insts {
    match *inst {
      Inst::Label(label) => writeln!(w, "{}:", label.render(syms))?,
      Inst::Prologue { frame } => {
        writeln!(w, "  prologue")?;
        writeln!(w, "  alloc {frame}")?;
      }
      Inst::Epilogue => writeln!(w, "  epilogue")?,
      Inst::StoreArg { reg, offset } => writeln!(w, "  store r{reg} [fp, #-{offset}]")?,
      Inst::Push => writeln!(w, "  push r0")?,
      Inst::Pop { reg } => writeln!(w, "  pop r{reg}")?,
      Inst::MovImm { imm } => writeln!(w, "  r0 <- #{imm}")?,
      Inst::Neg => writeln!(w, "  r0 <- -r0")?,
      Inst::LocalAddr { offset } => writeln!(w, "  r0 <- fp - #{offset}")?,
      Inst::GlobalAddr { name } => writeln!(w, "  r0 <- &{}", syms.name(name))?,
      Inst::Load => writeln!(w, "  r0 <- [r0]")?,
      Inst::Store => writeln!(w, "  [r1] <- r0")?,
      Inst::Add => writeln!(w, "  r0 <- r0 + r1")?,
      Inst::Sub => writeln!(w, "  r0 <- r0 - r1")?,
      Inst::Mul => writeln!(w, "  r0 <- r0 * r1")?,
      Inst::Div => writeln!(w, "  r0, r1 <- r0 / r1")?,
      Inst::Cmp(cond) => {
        let cond = match cond {
          Cond::Eq => "eq",
          Cond::Ne => "neq",
          Cond::Lt => "lt",
          Cond::Le => "lte",
        };
        writeln!(w, "  r0 <- {cond} ? 1 : 0")?;
      }
      Inst::BranchZero(label) => writeln!(w, "  beqz {}", label.render(syms))?,
      Inst::Branch(label) => writeln!(w, "  b {}", label.render(syms))?,
      Inst::Call(name) => writeln!(w, "  call {}", syms.name(name))?,
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use crate::debug_dump;

  #[test]
  fn dump_is_canonical_over_whitespace() {
    let a = debug_dump("int main() { return 1+2; }").unwrap();
    let b = debug_dump("int  main()\n{\n  return 1 + 2;\n}").unwrap();
    assert_eq!(a, b);
    assert!(a.contains("main :: { (return (+ 1, 2)) }"));
  }

  #[test]
  fn pointer_variables_are_starred() {
    let out = debug_dump("int main() { int x; int *p; p = &x; return 0; }").unwrap();
    assert!(out.contains("(let *p (addr x))"));
    assert!(out.contains("main local variables:  x  p"));
  }

  #[test]
  fn loops_and_ifs_render() {
    let out =
      debug_dump("int main() { int i; for (i=0; i<3; i=i+1) if (i) i; return i; }").unwrap();
    assert!(out.contains("(loop"));
    assert!(out.contains("(if i"));
    assert!(out.contains(".global fn main"));
  }
}
