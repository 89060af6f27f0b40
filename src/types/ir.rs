//! The linear intermediate representation.
//!
//! Instructions are one step above the emitted text: each variant maps to a
//! fixed ARM sequence using only the accumulator `r0`, the scratch `r1`,
//! and the machine stack. The builder produces one flat instruction list
//! for the whole program; the emitter formats it without further decisions.

use crate::symbol::{Interner, Symbol};

/// A control-flow label. All internal labels are namespaced by the
/// enclosing function and, for branch targets, a counter that is monotonic
/// across the whole compilation, so every label in the output is unique.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
  /// Function entry: `<fn>`.
  Fn(Symbol),
  /// `<fn>.return`
  Return(Symbol),
  /// `<fn>.if.else.<n>`
  IfElse(Symbol, u32),
  /// `<fn>.if.end.<n>`
  IfEnd(Symbol, u32),
  /// `<fn>.loop.begin.<n>`
  LoopBegin(Symbol, u32),
  /// `<fn>.loop.end.<n>`
  LoopEnd(Symbol, u32),
}

impl Label {
  /// The label's spelling in the output.
  #[must_use]
  pub fn render(self, syms: &Interner<'_>) -> String {
    match self {
      Label::Fn(f) => syms.name(f).to_owned(),
      Label::Return(f) => format!("{}.return", syms.name(f)),
      Label::IfElse(f, n) => format!("{}.if.else.{n}", syms.name(f)),
      Label::IfEnd(f, n) => format!("{}.if.end.{n}", syms.name(f)),
      Label::LoopBegin(f, n) => format!("{}.loop.begin.{n}", syms.name(f)),
      Label::LoopEnd(f, n) => format!("{}.loop.end.{n}", syms.name(f)),
    }
  }
}

/// Condition materialized into `r0` after `cmp r0, r1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
  Eq,
  Ne,
  Lt,
  Le,
}

/// One IR instruction. The comments give the emitted ARM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inst {
  /// `<label>:`
  Label(Label),
  /// `push {fp, lr}` / `add fp, sp, #4` / `sub sp, sp, #<frame>`
  Prologue { frame: u32 },
  /// `sub sp, fp, #4` / `pop {fp, pc}`
  Epilogue,
  /// `str r<reg>, [fp, #-<offset>]` — spill an argument register into its
  /// parameter's frame slot.
  StoreArg { reg: u8, offset: u32 },
  /// `push {r0}`
  Push,
  /// `pop {r<reg>}`
  Pop { reg: u8 },
  /// `mov r0, #<imm>`
  MovImm { imm: i32 },
  /// `neg r0, r0`
  Neg,
  /// `sub r0, fp, #<offset>` — address of a local.
  LocalAddr { offset: u32 },
  /// `ldr r0, =<name>` — address of a global.
  GlobalAddr { name: Symbol },
  /// `ldr r0, [r0]`
  Load,
  /// `str r0, [r1]`
  Store,
  /// `add r0, r0, r1`
  Add,
  /// `sub r0, r0, r1`
  Sub,
  /// `mul r0, r0, r1`
  Mul,
  /// `bl __div` — quotient in `r0`, remainder in `r1`.
  Div,
  /// `cmp r0, r1` then a conditional move pair writing 1 or 0 to `r0`.
  Cmp(Cond),
  /// `cmp r0, #0` / `beq <label>`
  BranchZero(Label),
  /// `b <label>`
  Branch(Label),
  /// `bl <name>`
  Call(Symbol),
}

/// The compiled program: exported names, global storage reservations, and
/// the instruction stream.
#[derive(Debug)]
pub struct Ir {
  /// Defined functions in source order.
  pub funcs: Vec<Symbol>,
  /// Global variables with their reserved sizes in bytes.
  pub globals: Vec<(Symbol, u32)>,
  pub insts: Vec<Inst>,
  /// Whether any division was lowered; controls the `__div` helper.
  pub uses_div: bool,
}
