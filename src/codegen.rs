//! Formatting the linear IR as ARM assembly.
//!
//! Each instruction expands to a fixed text sequence; all decisions were
//! made by the IR builder. The output is GAS syntax for 32-bit ARM:
//! `.global` directives, one block per function (entry label, prologue,
//! body, return label, epilogue), the `__div` helper when any division was
//! lowered, and a `.bss` section reserving storage for globals.

use std::io::{self, Write};

use crate::symbol::Interner;
use crate::types::ir::{Cond, Inst, Ir};

/// Write the whole program to `w`.
pub fn emit(ir: &Ir, syms: &Interner<'_>, w: &mut impl Write) -> io::Result<()> {
  // Exported symbols, main first.
  let (mains, rest): (Vec<_>, Vec<_>) =
    ir.funcs.iter().partition(|&&f| syms.name(f) == "main");
  for &f in mains.into_iter().chain(rest) {
    writeln!(w, ".global {}", syms.name(f))?;
  }
  writeln!(w)?;

  for inst in &ir.insts {
    write_inst(w, syms, inst)?;
  }

  if ir.uses_div {
    write_div(w)?;
  }

  if !ir.globals.is_empty() {
    writeln!(w, ".bss")?;
    for &(name, size) in &ir.globals {
      writeln!(w, "{}:", syms.name(name))?;
      writeln!(w, "  .zero {size}")?;
    }
  }

  Ok(())
}

fn write_inst(w: &mut impl Write, syms: &Interner<'_>, inst: &Inst) -> io::Result<()> {
  match *inst {
    Inst::Label(label) => writeln!(w, "{}:", label.render(syms)),
    Inst::Prologue { frame } => {
      writeln!(w, "  push  {{fp, lr}}")?;
      writeln!(w, "  add   fp, sp, #4")?;
      writeln!(w, "  sub   sp, sp, #{frame}")
    }
    Inst::Epilogue => {
      writeln!(w, "  sub   sp, fp, #4")?;
      writeln!(w, "  pop   {{fp, pc}}")?;
      writeln!(w)
    }
    Inst::StoreArg { reg, offset } => writeln!(w, "  str   r{reg}, [fp, #-{offset}]"),
    Inst::Push => writeln!(w, "  push  {{r0}}"),
    Inst::Pop { reg } => writeln!(w, "  pop   {{r{reg}}}"),
    Inst::MovImm { imm } => writeln!(w, "  mov   r0, #{imm}"),
    Inst::Neg => writeln!(w, "  neg   r0, r0"),
    Inst::LocalAddr { offset } => writeln!(w, "  sub   r0, fp, #{offset}"),
    Inst::GlobalAddr { name } => writeln!(w, "  ldr   r0, ={}", syms.name(name)),
    Inst::Load => writeln!(w, "  ldr   r0, [r0]"),
    Inst::Store => writeln!(w, "  str   r0, [r1]"),
    Inst::Add => writeln!(w, "  add   r0, r0, r1"),
    Inst::Sub => writeln!(w, "  sub   r0, r0, r1"),
    Inst::Mul => writeln!(w, "  mul   r0, r0, r1"),
    Inst::Div => writeln!(w, "  bl    __div"),
    Inst::Cmp(cond) => {
      writeln!(w, "  cmp   r0, r1")?;
      let (if_true, if_false) = match cond {
        Cond::Eq => ("moveq", "movne"),
        Cond::Ne => ("movne", "moveq"),
        Cond::Lt => ("movlt", "movge"),
        Cond::Le => ("movle", "movgt"),
      };
      writeln!(w, "  {if_true} r0, #1")?;
      writeln!(w, "  {if_false} r0, #0")
    }
    Inst::BranchZero(label) => {
      writeln!(w, "  cmp   r0, #0")?;
      writeln!(w, "  beq   {}", label.render(syms))
    }
    Inst::Branch(label) => writeln!(w, "  b     {}", label.render(syms)),
    Inst::Call(name) => writeln!(w, "  bl    {}", syms.name(name)),
  }
}

/// The unsigned division subroutine.
///
/// Inputs: `r0` dividend, `r1` divisor. Outputs: `r0` quotient, `r1`
/// remainder. Clobbers `r2`/`r3`, which are never live across an
/// expression under this code generator. A zero divisor falls straight
/// through to the epilogue: the outputs are whatever the caller left in
/// `r0`/`r1` (undefined-on-zero).
///
/// Shift-and-subtract: the divisor is shifted left until it exceeds the
/// dividend, then repeatedly subtracted while a mirrored bit field
/// accumulates the quotient.
fn write_div(w: &mut impl Write) -> io::Result<()> {
  writeln!(w, "__div:")?;
  writeln!(w, "  push  {{fp, lr}}")?;
  writeln!(w, "  add   fp, sp, #4")?;
  writeln!(w, "  cmp   r1, #0")?;
  writeln!(w, "  beq   __div_end")?;
  writeln!(w, "  push  {{r0, r1}}")?;
  writeln!(w, "  mov   r0, #0")?;
  writeln!(w, "  pop   {{r1, r2}}")?;
  writeln!(w, "  mov   r3, #1")?;
  writeln!(w, "__div_shift:")?;
  writeln!(w, "  cmp   r2, r1")?;
  writeln!(w, "  lslls r2, r2, #1")?;
  writeln!(w, "  lslls r3, r3, #1")?;
  writeln!(w, "  bls   __div_shift")?;
  writeln!(w, "__div_sub:")?;
  writeln!(w, "  cmp   r1, r2")?;
  writeln!(w, "  subcs r1, r1, r2")?;
  writeln!(w, "  addcs r0, r0, r3")?;
  writeln!(w, "  lsrs  r3, r3, #1")?;
  writeln!(w, "  lsrcc r2, r2, #1")?;
  writeln!(w, "  bcc   __div_sub")?;
  writeln!(w, "__div_end:")?;
  writeln!(w, "  sub   sp, fp, #4")?;
  writeln!(w, "  pop   {{fp, pc}}")?;
  writeln!(w)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::compile;

  #[test]
  fn minimal_function_matches_exactly() {
    let asm = compile("int main() { return 0; }").unwrap();
    let expected = "\
.global main

main:
  push  {fp, lr}
  add   fp, sp, #4
  sub   sp, sp, #16
  mov   r0, #0
  b     main.return
main.return:
  sub   sp, fp, #4
  pop   {fp, pc}

";
    assert_eq!(asm, expected);
  }

  #[test]
  fn binary_operands_evaluate_right_first() {
    let asm = compile("int main() { return 1 - 2; }").unwrap();
    let expected = "\
.global main

main:
  push  {fp, lr}
  add   fp, sp, #4
  sub   sp, sp, #16
  mov   r0, #2
  push  {r0}
  mov   r0, #1
  pop   {r1}
  sub   r0, r0, r1
  b     main.return
main.return:
  sub   sp, fp, #4
  pop   {fp, pc}

";
    assert_eq!(asm, expected);
  }

  #[test]
  fn division_appends_the_helper() {
    let asm = compile("int main() { return 10 / 3; }").unwrap();
    assert!(asm.contains("  bl    __div\n"));
    assert!(asm.ends_with("__div_end:\n  sub   sp, fp, #4\n  pop   {fp, pc}\n\n"));
    // Exactly one copy.
    assert_eq!(asm.matches("__div:").count(), 1);
  }

  #[test]
  fn no_division_no_helper() {
    let asm = compile("int main() { return 10 - 3; }").unwrap();
    assert!(!asm.contains("__div"));
  }

  #[test]
  fn comparison_materializes_both_arms() {
    let asm = compile("int main() { return 1 < 2; }").unwrap();
    assert!(asm.contains("  cmp   r0, r1\n  movlt r0, #1\n  movge r0, #0\n"));
  }

  #[test]
  fn globals_reserve_bss_storage() {
    let asm = compile("int x; int a[3]; int main() { return x; }").unwrap();
    assert!(asm.contains(".bss\nx:\n  .zero 4\na:\n  .zero 12\n"));
    assert!(asm.contains("  ldr   r0, =x\n  ldr   r0, [r0]\n"));
  }

  #[test]
  fn main_is_exported_first() {
    let asm = compile("int helper() { return 1; } int main() { return helper(); }").unwrap();
    assert!(asm.starts_with(".global main\n.global helper\n\n"));
    assert!(asm.contains("  bl    helper\n"));
  }
}
