//! The recursive-descent parser.
//!
//! One left-to-right pass with single-token lookahead over the lexed token
//! stream, producing arena-allocated declarations. The parser owns the two
//! scopes (current-function locals and module globals), performs the
//! type-aware rewrites at `+` and `-` (pointer operands scale their integer
//! partner by the element size), desugars `x[y]` into `*(x + y)`, folds
//! `sizeof` into a literal, and runs type elaboration inline after each
//! block-level statement so that later statements see fully typed
//! predecessors.
//!
//! Grammar:
//!
//! ```text
//! program       := (function-def | global-var)*
//! function-def  := typespec declarator "{" compound-stmt
//! global-var    := typespec declarator ("," declarator)* ";"
//! typespec      := "int"
//! declarator    := "*"* ident type-suffix
//! type-suffix   := "(" func-params | "[" num "]" type-suffix | ε
//! func-params   := (param ("," param)*)? ")"
//! param         := typespec declarator
//! declaration   := typespec (declarator ("=" assign)? ("," ...)*)? ";"
//! compound-stmt := (declaration | stmt)* "}"
//! stmt          := "return" expr ";"
//!                | "if" "(" expr ")" stmt ("else" stmt)?
//!                | "for" "(" expr-stmt expr? ";" expr? ")" stmt
//!                | "while" "(" expr ")" stmt
//!                | "{" compound-stmt
//!                | expr-stmt
//! expr-stmt     := expr? ";"
//! expr          := assign
//! assign        := equality ("=" assign)?
//! equality      := relational (("==" | "!=") relational)*
//! relational    := add (("<" | "<=" | ">" | ">=") add)*
//! add           := mul (("+" | "-") mul)*
//! mul           := unary (("*" | "/") unary)*
//! unary         := ("+" | "-" | "&" | "*") unary | postfix
//! postfix       := primary ("[" expr "]")*
//! primary       := "(" expr ")" | "sizeof" unary | ident fn-args? | num
//! fn-args       := "(" (assign ("," assign)*)? ")"
//! ```

use std::cell::Cell;

use bumpalo::collections::Vec as BumpVec;
use smallvec::SmallVec;

use crate::CompileError;
use crate::arena::Arena;
use crate::symbol::{Interner, Symbol};
use crate::typecheck;
use crate::types::ast::{
  BinOp, Expr, ExprKind, FnDef, Obj, ObjAttr, Program, Stmt, StmtKind,
};
use crate::types::token::{Token, TokenKind};
use crate::types::ty::{Param, TY_INT, Ty, TyKind};

/// Number of argument registers in the calling convention.
const MAX_ARGS: usize = 4;

type Result<T> = std::result::Result<T, CompileError>;

/// Parse a token stream into a list of top-level declarations.
pub fn parse<'a>(arena: &'a Arena, src: &str, toks: &[Token]) -> Result<Program<'a>> {
  let mut p = Parser {
    arena,
    src,
    toks,
    pos: 0,
    syms: Interner::new(arena),
    locals: Vec::new(),
    globals: Vec::new(),
    decls: Vec::new(),
  };
  p.program()?;
  Ok(Program { decls: p.decls, syms: p.syms })
}

struct Parser<'a, 's> {
  arena: &'a Arena,
  src: &'s str,
  toks: &'s [Token],
  pos: usize,
  syms: Interner<'a>,
  /// Locals of the function being parsed, in declaration order
  /// (parameters first). Resolution scans most-recent-first.
  locals: Vec<&'a Obj<'a>>,
  /// Module-level variables. Function names are not variables and never
  /// enter this list.
  globals: Vec<&'a Obj<'a>>,
  /// Everything declared, in source order; the parse result.
  decls: Vec<&'a Obj<'a>>,
}

impl<'a, 's> Parser<'a, 's> {
  fn tok(&self) -> Token {
    self.toks[self.pos]
  }

  fn at(&self, s: &str) -> bool {
    self.tok().text(self.src) == s
  }

  /// Advance past `s` or fail.
  fn skip(&mut self, s: &str) -> Result<()> {
    if self.at(s) {
      self.pos += 1;
      Ok(())
    } else {
      Err(self.error(format!("expected '{s}'")))
    }
  }

  /// Advance past `s` if it is next.
  fn consume(&mut self, s: &str) -> bool {
    if self.at(s) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn error(&self, msg: impl Into<String>) -> CompileError {
    CompileError::parse(self.tok().loc, msg)
  }

  fn new_expr(&self, kind: ExprKind<'a>, loc: u32) -> &'a Expr<'a> {
    self.arena.alloc(Expr { kind, loc, ty: Cell::new(None) })
  }

  fn new_stmt(&self, kind: StmtKind<'a>, loc: u32) -> &'a Stmt<'a> {
    self.arena.alloc(Stmt { kind, loc })
  }

  fn new_lvar(&mut self, name: Symbol, ty: Ty<'a>) -> &'a Obj<'a> {
    let obj = self.arena.alloc(Obj {
      name,
      ty,
      attr: ObjAttr::LOCAL,
      offset: Cell::new(0),
      def: None,
    });
    self.locals.push(obj);
    obj
  }

  fn new_gvar(&mut self, name: Symbol, ty: Ty<'a>) -> &'a Obj<'a> {
    let obj = self.arena.alloc(Obj {
      name,
      ty,
      attr: ObjAttr::empty(),
      offset: Cell::new(0),
      def: None,
    });
    self.globals.push(obj);
    self.decls.push(obj);
    obj
  }

  /// Resolve a name: current function locals first (most recent
  /// declaration wins), then module globals.
  fn find_var(&self, name: &str) -> Option<&'a Obj<'a>> {
    self
      .locals
      .iter()
      .rev()
      .chain(self.globals.iter().rev())
      .copied()
      .find(|obj| self.syms.name(obj.name) == name)
  }

  fn get_number(&mut self) -> Result<i32> {
    let tok = self.tok();
    if tok.kind != TokenKind::Num {
      return Err(self.error("expected a number"));
    }
    self.pos += 1;
    Ok(tok.val)
  }

  // program := (function-def | global-var)*
  fn program(&mut self) -> Result<()> {
    while self.tok().kind != TokenKind::Eof {
      let base = self.typespec()?;
      if self.is_function()? {
        self.function(base)?;
      } else {
        self.global_variable(base)?;
      }
    }
    Ok(())
  }

  // typespec := "int"
  fn typespec(&mut self) -> Result<Ty<'a>> {
    self.skip("int")?;
    Ok(TY_INT)
  }

  /// Decide between a function definition and global variables by parsing
  /// a declarator against a throwaway base type, then rewinding. Scope
  /// state is untouched; the speculative types are arena garbage owned
  /// like everything else.
  fn is_function(&mut self) -> Result<bool> {
    if self.at(";") {
      return Ok(false);
    }
    let save = self.pos;
    let result = self.declarator(TY_INT).map(|(ty, _, _)| matches!(*ty, TyKind::Func { .. }));
    self.pos = save;
    result
  }

  // declarator := "*"* ident type-suffix
  fn declarator(&mut self, base: Ty<'a>) -> Result<(Ty<'a>, Symbol, u32)> {
    let mut ty = base;
    while self.consume("*") {
      ty = self.arena.alloc(TyKind::Ptr(ty));
    }

    let tok = self.tok();
    if tok.kind != TokenKind::Ident {
      return Err(self.error("expected a variable name"));
    }
    let name = self.syms.intern(tok.text(self.src));
    self.pos += 1;

    let ty = self.type_suffix(ty)?;
    Ok((ty, name, tok.loc))
  }

  // type-suffix := "(" func-params | "[" num "]" type-suffix | ε
  fn type_suffix(&mut self, ty: Ty<'a>) -> Result<Ty<'a>> {
    if self.consume("(") {
      return self.func_params(ty);
    }

    if self.consume("[") {
      let len = self.get_number()?;
      self.skip("]")?;
      let inner = self.type_suffix(ty)?;
      return Ok(self.arena.alloc(TyKind::Array(inner, len as u32)));
    }

    Ok(ty)
  }

  // func-params := (param ("," param)*)? ")"
  // param       := typespec declarator
  fn func_params(&mut self, ret: Ty<'a>) -> Result<Ty<'a>> {
    let mut params = SmallVec::<[Param<'a>; MAX_ARGS]>::new();
    while !self.at(")") {
      if !params.is_empty() {
        self.skip(",")?;
      }
      let base = self.typespec()?;
      let (ty, name, loc) = self.declarator(base)?;
      if params.len() == MAX_ARGS {
        return Err(CompileError::parse(loc, "too many parameters"));
      }
      params.push(Param { name, ty });
    }
    self.pos += 1; // ")"

    let params = self.arena.alloc_slice(&params);
    Ok(self.arena.alloc(TyKind::Func { ret, params }))
  }

  // function-def := typespec declarator "{" compound-stmt
  fn function(&mut self, base: Ty<'a>) -> Result<()> {
    let (ty, name, _) = self.declarator(base)?;
    let TyKind::Func { params, .. } = *ty else {
      unreachable!("declarator kind was checked by is_function");
    };

    self.locals.clear();
    for param in params {
      self.new_lvar(param.name, param.ty);
    }

    self.skip("{")?;
    let body = self.compound_stmt()?;

    let locals = self.arena.alloc_slice(&self.locals);
    let def = FnDef {
      params: &locals[..params.len()],
      locals,
      body,
      stack_size: Cell::new(0),
    };
    let obj = self.arena.alloc(Obj {
      name,
      ty,
      attr: ObjAttr::FUNCTION,
      offset: Cell::new(0),
      def: Some(def),
    });
    self.decls.push(obj);
    Ok(())
  }

  // global-var := typespec declarator ("," declarator)* ";"
  fn global_variable(&mut self, base: Ty<'a>) -> Result<()> {
    let mut first = true;
    while !self.consume(";") {
      if !first {
        self.skip(",")?;
      }
      first = false;

      let (ty, name, _) = self.declarator(base)?;
      self.new_gvar(name, ty);
    }
    Ok(())
  }

  // declaration := typespec (declarator ("=" assign)? ("," ...)*)? ";"
  fn declaration(&mut self) -> Result<&'a Stmt<'a>> {
    let loc = self.tok().loc;
    let base = self.typespec()?;

    let mut stmts = BumpVec::new_in(self.arena.bump());
    let mut first = true;
    while !self.at(";") {
      if !first {
        self.skip(",")?;
      }
      first = false;

      let (ty, name, name_loc) = self.declarator(base)?;
      let var = self.new_lvar(name, ty);

      if !self.consume("=") {
        continue;
      }
      let lhs = self.new_expr(ExprKind::Var(var), name_loc);
      let rhs = self.assign()?;
      let init = self.new_expr(ExprKind::Assign(lhs, rhs), name_loc);
      stmts.push(self.new_stmt(StmtKind::Expr(init), name_loc));
    }
    self.pos += 1; // ";"

    Ok(self.new_stmt(StmtKind::Block(stmts.into_bump_slice()), loc))
  }

  // compound-stmt := (declaration | stmt)* "}"
  fn compound_stmt(&mut self) -> Result<&'a Stmt<'a>> {
    let loc = self.tok().loc;
    let mut body = BumpVec::new_in(self.arena.bump());
    while !self.at("}") {
      let stmt = if self.at("int") { self.declaration()? } else { self.stmt()? };
      typecheck::check_stmt(self.arena, stmt)?;
      body.push(stmt);
    }
    self.pos += 1; // "}"
    Ok(self.new_stmt(StmtKind::Block(body.into_bump_slice()), loc))
  }

  // stmt := "return" expr ";"
  //       | "if" "(" expr ")" stmt ("else" stmt)?
  //       | "for" "(" expr-stmt expr? ";" expr? ")" stmt
  //       | "while" "(" expr ")" stmt
  //       | "{" compound-stmt
  //       | expr-stmt
  fn stmt(&mut self) -> Result<&'a Stmt<'a>> {
    let loc = self.tok().loc;

    if self.consume("return") {
      let value = self.expr()?;
      self.skip(";")?;
      return Ok(self.new_stmt(StmtKind::Return(value), loc));
    }

    if self.consume("if") {
      self.skip("(")?;
      let cond = self.expr()?;
      self.skip(")")?;
      let then = self.stmt()?;
      let els = if self.consume("else") { Some(self.stmt()?) } else { None };
      return Ok(self.new_stmt(StmtKind::If { cond, then, els }, loc));
    }

    if self.consume("for") {
      self.skip("(")?;
      let init = self.expr_stmt()?;
      let cond = if self.at(";") { None } else { Some(self.expr()?) };
      self.skip(";")?;
      let step = if self.at(")") { None } else { Some(self.expr()?) };
      self.skip(")")?;
      let body = self.stmt()?;
      return Ok(self.new_stmt(StmtKind::Loop { init: Some(init), cond, step, body }, loc));
    }

    if self.consume("while") {
      self.skip("(")?;
      let cond = self.expr()?;
      self.skip(")")?;
      let body = self.stmt()?;
      return Ok(self.new_stmt(
        StmtKind::Loop { init: None, cond: Some(cond), step: None, body },
        loc,
      ));
    }

    if self.consume("{") {
      return self.compound_stmt();
    }

    self.expr_stmt()
  }

  // expr-stmt := expr? ";"
  fn expr_stmt(&mut self) -> Result<&'a Stmt<'a>> {
    let loc = self.tok().loc;
    if self.consume(";") {
      return Ok(self.new_stmt(StmtKind::Block(&[]), loc));
    }
    let e = self.expr()?;
    self.skip(";")?;
    Ok(self.new_stmt(StmtKind::Expr(e), loc))
  }

  // expr := assign
  fn expr(&mut self) -> Result<&'a Expr<'a>> {
    self.assign()
  }

  // assign := equality ("=" assign)?
  fn assign(&mut self) -> Result<&'a Expr<'a>> {
    let node = self.equality()?;
    if self.at("=") {
      let loc = self.tok().loc;
      self.pos += 1;
      let rhs = self.assign()?;
      return Ok(self.new_expr(ExprKind::Assign(node, rhs), loc));
    }
    Ok(node)
  }

  // equality := relational (("==" | "!=") relational)*
  fn equality(&mut self) -> Result<&'a Expr<'a>> {
    let mut node = self.relational()?;

    loop {
      let loc = self.tok().loc;
      if self.consume("==") {
        let rhs = self.relational()?;
        node = self.new_expr(ExprKind::Binary(BinOp::Eq, node, rhs), loc);
      } else if self.consume("!=") {
        let rhs = self.relational()?;
        node = self.new_expr(ExprKind::Binary(BinOp::Ne, node, rhs), loc);
      } else {
        return Ok(node);
      }
    }
  }

  // relational := add (("<" | "<=" | ">" | ">=") add)*
  //
  // `>` and `>=` have no node kinds of their own; the operands swap
  // around `<` and `<=`.
  fn relational(&mut self) -> Result<&'a Expr<'a>> {
    let mut node = self.add()?;

    loop {
      let loc = self.tok().loc;
      if self.consume("<") {
        let rhs = self.add()?;
        node = self.new_expr(ExprKind::Binary(BinOp::Lt, node, rhs), loc);
      } else if self.consume("<=") {
        let rhs = self.add()?;
        node = self.new_expr(ExprKind::Binary(BinOp::Le, node, rhs), loc);
      } else if self.consume(">") {
        let lhs = self.add()?;
        node = self.new_expr(ExprKind::Binary(BinOp::Lt, lhs, node), loc);
      } else if self.consume(">=") {
        let lhs = self.add()?;
        node = self.new_expr(ExprKind::Binary(BinOp::Le, lhs, node), loc);
      } else {
        return Ok(node);
      }
    }
  }

  /// Build `lhs + rhs`, scaling for pointer arithmetic.
  ///
  /// `p + n` moves `p` by `n` elements, not bytes: the integer operand is
  /// multiplied by the element size known from the pointer's base type.
  /// Adding two pointers is rejected.
  fn new_add(&mut self, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>, loc: u32) -> Result<&'a Expr<'a>> {
    typecheck::add_type(self.arena, lhs)?;
    typecheck::add_type(self.arena, rhs)?;
    let lty = lhs.ty.get().expect("lhs was elaborated");
    let rty = rhs.ty.get().expect("rhs was elaborated");

    if lty.is_integer() && rty.is_integer() {
      return Ok(self.new_expr(ExprKind::Binary(BinOp::Add, lhs, rhs), loc));
    }

    if lty.base().is_some() && rty.base().is_some() {
      return Err(CompileError::ty(loc, "invalid operands"));
    }

    // Canonicalize to pointer + integer.
    let (ptr, num) = if lty.base().is_some() { (lhs, rhs) } else { (rhs, lhs) };
    let base = ptr.ty.get().expect("typed above").base().expect("pointer operand");
    let scale = self.new_expr(ExprKind::Num(base.size() as i32), loc);
    let scaled = self.new_expr(ExprKind::Binary(BinOp::Mul, num, scale), loc);
    Ok(self.new_expr(ExprKind::Binary(BinOp::Add, ptr, scaled), loc))
  }

  /// Build `lhs - rhs`, scaling for pointer arithmetic.
  ///
  /// `p - n` moves `p` back by `n` elements. `p - q` is the distance
  /// between two pointers in elements: the byte difference, typed as an
  /// integer, divided by the element size.
  fn new_sub(&mut self, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>, loc: u32) -> Result<&'a Expr<'a>> {
    typecheck::add_type(self.arena, lhs)?;
    typecheck::add_type(self.arena, rhs)?;
    let lty = lhs.ty.get().expect("lhs was elaborated");
    let rty = rhs.ty.get().expect("rhs was elaborated");

    if lty.is_integer() && rty.is_integer() {
      return Ok(self.new_expr(ExprKind::Binary(BinOp::Sub, lhs, rhs), loc));
    }

    if let Some(base) = lty.base() {
      if rty.is_integer() {
        let scale = self.new_expr(ExprKind::Num(base.size() as i32), loc);
        let scaled = self.new_expr(ExprKind::Binary(BinOp::Mul, rhs, scale), loc);
        let node = self.new_expr(ExprKind::Binary(BinOp::Sub, lhs, scaled), loc);
        node.ty.set(Some(lty));
        return Ok(node);
      }

      if rty.base().is_some() {
        let diff = self.new_expr(ExprKind::Binary(BinOp::Sub, lhs, rhs), loc);
        diff.ty.set(Some(TY_INT));
        let scale = self.new_expr(ExprKind::Num(base.size() as i32), loc);
        return Ok(self.new_expr(ExprKind::Binary(BinOp::Div, diff, scale), loc));
      }
    }

    Err(CompileError::ty(loc, "invalid operands"))
  }

  // add := mul (("+" | "-") mul)*
  fn add(&mut self) -> Result<&'a Expr<'a>> {
    let mut node = self.mul()?;

    loop {
      let loc = self.tok().loc;
      if self.consume("+") {
        let rhs = self.mul()?;
        node = self.new_add(node, rhs, loc)?;
      } else if self.consume("-") {
        let rhs = self.mul()?;
        node = self.new_sub(node, rhs, loc)?;
      } else {
        return Ok(node);
      }
    }
  }

  // mul := unary (("*" | "/") unary)*
  fn mul(&mut self) -> Result<&'a Expr<'a>> {
    let mut node = self.unary()?;

    loop {
      let loc = self.tok().loc;
      if self.consume("*") {
        let rhs = self.unary()?;
        node = self.new_expr(ExprKind::Binary(BinOp::Mul, node, rhs), loc);
      } else if self.consume("/") {
        let rhs = self.unary()?;
        node = self.new_expr(ExprKind::Binary(BinOp::Div, node, rhs), loc);
      } else {
        return Ok(node);
      }
    }
  }

  // unary := ("+" | "-" | "&" | "*") unary | postfix
  fn unary(&mut self) -> Result<&'a Expr<'a>> {
    let loc = self.tok().loc;

    if self.consume("+") {
      return self.unary();
    }
    if self.consume("-") {
      let operand = self.unary()?;
      return Ok(self.new_expr(ExprKind::Neg(operand), loc));
    }
    if self.consume("&") {
      let operand = self.unary()?;
      return Ok(self.new_expr(ExprKind::Addr(operand), loc));
    }
    if self.consume("*") {
      let operand = self.unary()?;
      return Ok(self.new_expr(ExprKind::Deref(operand), loc));
    }

    self.postfix()
  }

  // postfix := primary ("[" expr "]")*
  fn postfix(&mut self) -> Result<&'a Expr<'a>> {
    let mut node = self.primary()?;

    while self.at("[") {
      // x[y] is sugar for *(x + y)
      let loc = self.tok().loc;
      self.pos += 1;
      let idx = self.expr()?;
      self.skip("]")?;
      let sum = self.new_add(node, idx, loc)?;
      node = self.new_expr(ExprKind::Deref(sum), loc);
    }

    Ok(node)
  }

  // fn-args := "(" (assign ("," assign)*)? ")"
  fn fn_call(&mut self) -> Result<&'a Expr<'a>> {
    let start = self.tok();
    let name = self.syms.intern(start.text(self.src));
    self.pos += 2; // ident "("

    let mut args = BumpVec::new_in(self.arena.bump());
    while !self.at(")") {
      if !args.is_empty() {
        self.skip(",")?;
      }
      let arg = self.assign()?;
      if args.len() == MAX_ARGS {
        return Err(CompileError::parse(arg.loc, "too many arguments"));
      }
      args.push(arg);
    }
    self.pos += 1; // ")"

    Ok(self.new_expr(ExprKind::Call(name, args.into_bump_slice()), start.loc))
  }

  // primary := "(" expr ")" | "sizeof" unary | ident fn-args? | num
  fn primary(&mut self) -> Result<&'a Expr<'a>> {
    let tok = self.tok();

    if self.consume("(") {
      let node = self.expr()?;
      self.skip(")")?;
      return Ok(node);
    }

    if self.consume("sizeof") {
      // The operand is elaborated on the spot and folded away; only its
      // size survives into the program.
      let operand = self.unary()?;
      typecheck::add_type(self.arena, operand)?;
      let size = operand.ty.get().expect("operand was elaborated").size();
      return Ok(self.new_expr(ExprKind::Num(size as i32), tok.loc));
    }

    if tok.kind == TokenKind::Ident {
      if self.toks[self.pos + 1].text(self.src) == "(" {
        return self.fn_call();
      }

      let var = self
        .find_var(tok.text(self.src))
        .ok_or_else(|| CompileError::parse(tok.loc, "undefined variable"))?;
      self.pos += 1;
      return Ok(self.new_expr(ExprKind::Var(var), tok.loc));
    }

    if tok.kind == TokenKind::Num {
      self.pos += 1;
      return Ok(self.new_expr(ExprKind::Num(tok.val), tok.loc));
    }

    Err(self.error("expected an expression"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexer::tokenize;

  fn parse_src<'a>(arena: &'a Arena, src: &str) -> Result<Program<'a>> {
    let toks = tokenize(src).unwrap();
    parse(arena, src, &toks)
  }

  fn body_of<'a>(prog: &Program<'a>, name: &str) -> &'a Stmt<'a> {
    prog
      .decls
      .iter()
      .find(|obj| prog.syms.name(obj.name) == name)
      .and_then(|obj| obj.def.as_ref())
      .expect("function not found")
      .body
  }

  /// The expression of the first non-empty statement in a function body.
  fn first_expr<'a>(prog: &Program<'a>, name: &str) -> &'a Expr<'a> {
    let StmtKind::Block(body) = body_of(prog, name).kind else { panic!("body is a block") };
    for stmt in body {
      match stmt.kind {
        StmtKind::Expr(e) | StmtKind::Return(e) => return e,
        StmtKind::Block(inner) if !inner.is_empty() => {
          if let StmtKind::Expr(e) | StmtKind::Return(e) = inner[0].kind {
            return e;
          }
        }
        _ => {}
      }
    }
    panic!("no expression statement")
  }

  #[test]
  fn precedence_builds_the_expected_tree() {
    let arena = Arena::new();
    let prog = parse_src(&arena, "int main() { return 1+2*3; }").unwrap();
    let ExprKind::Binary(BinOp::Add, lhs, rhs) = first_expr(&prog, "main").kind else {
      panic!("expected addition at the root");
    };
    assert!(matches!(lhs.kind, ExprKind::Num(1)));
    let ExprKind::Binary(BinOp::Mul, mlhs, mrhs) = rhs.kind else {
      panic!("expected multiplication on the right");
    };
    assert!(matches!(mlhs.kind, ExprKind::Num(2)));
    assert!(matches!(mrhs.kind, ExprKind::Num(3)));
  }

  #[test]
  fn greater_than_swaps_operands() {
    let arena = Arena::new();
    let prog = parse_src(&arena, "int main() { return 2 > 1; }").unwrap();
    let ExprKind::Binary(BinOp::Lt, lhs, rhs) = first_expr(&prog, "main").kind else {
      panic!("expected a '<' node");
    };
    assert!(matches!(lhs.kind, ExprKind::Num(1)));
    assert!(matches!(rhs.kind, ExprKind::Num(2)));
  }

  #[test]
  fn pointer_addition_scales_by_element_size() {
    let arena = Arena::new();
    let prog = parse_src(&arena, "int main() { int x; int *p; p = &x; return *(p + 2); }").unwrap();
    let StmtKind::Block(body) = body_of(&prog, "main").kind else { panic!() };
    let StmtKind::Return(ret) = body.last().unwrap().kind else { panic!() };
    let ExprKind::Deref(sum) = ret.kind else { panic!("expected deref") };
    let ExprKind::Binary(BinOp::Add, _, scaled) = sum.kind else { panic!("expected add") };
    let ExprKind::Binary(BinOp::Mul, n, scale) = scaled.kind else {
      panic!("expected scaled index");
    };
    assert!(matches!(n.kind, ExprKind::Num(2)));
    assert!(matches!(scale.kind, ExprKind::Num(4)));
  }

  #[test]
  fn subscript_matches_explicit_pointer_arithmetic() {
    // `&a[n]` and `&a + n`-style scaling must synthesize the same factor.
    let arena = Arena::new();
    let prog = parse_src(
      &arena,
      "int main() { int a[3]; int n; n = 2; return a[n]; }",
    )
    .unwrap();
    let StmtKind::Block(body) = body_of(&prog, "main").kind else { panic!() };
    let StmtKind::Return(ret) = body.last().unwrap().kind else { panic!() };
    let ExprKind::Deref(sum) = ret.kind else { panic!("subscript desugars to deref") };
    let ExprKind::Binary(BinOp::Add, arr, scaled) = sum.kind else { panic!() };
    assert!(matches!(arr.kind, ExprKind::Var(_)));
    let ExprKind::Binary(BinOp::Mul, _, scale) = scaled.kind else { panic!() };
    assert!(matches!(scale.kind, ExprKind::Num(4)));
  }

  #[test]
  fn pointer_difference_divides_by_element_size() {
    let arena = Arena::new();
    let prog = parse_src(
      &arena,
      "int main() { int a[4]; int *p; int *q; p = &a[0]; q = &a[3]; return q - p; }",
    )
    .unwrap();
    let StmtKind::Block(body) = body_of(&prog, "main").kind else { panic!() };
    let StmtKind::Return(ret) = body.last().unwrap().kind else { panic!() };
    let ExprKind::Binary(BinOp::Div, diff, scale) = ret.kind else {
      panic!("pointer difference lowers to a division");
    };
    assert!(matches!(diff.kind, ExprKind::Binary(BinOp::Sub, _, _)));
    assert_eq!(diff.ty.get().unwrap(), TY_INT);
    assert!(matches!(scale.kind, ExprKind::Num(4)));
  }

  #[test]
  fn adding_two_pointers_is_rejected() {
    let arena = Arena::new();
    let err = parse_src(&arena, "int main() { int *p; int *q; return p + q; }").unwrap_err();
    assert_eq!(err.msg, "invalid operands");
  }

  #[test]
  fn sizeof_folds_to_a_literal() {
    let arena = Arena::new();
    let prog = parse_src(&arena, "int main() { int a[3]; return sizeof a; }").unwrap();
    let StmtKind::Block(body) = body_of(&prog, "main").kind else { panic!() };
    let StmtKind::Return(ret) = body.last().unwrap().kind else { panic!() };
    assert!(matches!(ret.kind, ExprKind::Num(12)));
  }

  #[test]
  fn undefined_variable_is_anchored_at_its_token() {
    let arena = Arena::new();
    let src = "int main() { return nope; }";
    let err = parse_src(&arena, src).unwrap_err();
    assert_eq!(err.msg, "undefined variable");
    assert_eq!(err.loc, Some(20));
  }

  #[test]
  fn locals_shadow_globals() {
    let arena = Arena::new();
    let prog = parse_src(&arena, "int x; int main() { int x; x = 1; return x; }").unwrap();
    let ExprKind::Assign(lhs, _) = first_expr(&prog, "main").kind else { panic!() };
    let ExprKind::Var(obj) = lhs.kind else { panic!() };
    assert!(obj.is_local());
  }

  #[test]
  fn params_are_the_locals_prefix() {
    let arena = Arena::new();
    let prog = parse_src(&arena, "int f(int a, int b) { int c; return a+b+c; }").unwrap();
    let def = prog.decls[0].def.as_ref().unwrap();
    assert_eq!(def.params.len(), 2);
    assert_eq!(def.locals.len(), 3);
    assert!(std::ptr::eq(def.params[0], def.locals[0]));
    assert!(std::ptr::eq(def.params[1], def.locals[1]));
    assert_eq!(prog.syms.name(def.locals[2].name), "c");
  }

  #[test]
  fn five_parameters_are_rejected() {
    let arena = Arena::new();
    let err =
      parse_src(&arena, "int f(int a, int b, int c, int d, int e) { return 0; }").unwrap_err();
    assert_eq!(err.msg, "too many parameters");
  }

  #[test]
  fn five_arguments_are_rejected() {
    let arena = Arena::new();
    let err = parse_src(&arena, "int main() { return f(1, 2, 3, 4, 5); }").unwrap_err();
    assert_eq!(err.msg, "too many arguments");
  }

  #[test]
  fn globals_and_functions_are_disambiguated() {
    let arena = Arena::new();
    let prog = parse_src(&arena, "int x, *y; int main() { return 0; } int z[2];").unwrap();
    let names: Vec<_> = prog.decls.iter().map(|o| prog.syms.name(o.name)).collect();
    assert_eq!(names, ["x", "y", "main", "z"]);
    assert!(!prog.decls[0].is_function());
    assert!(prog.decls[2].is_function());
    assert_eq!(*prog.decls[1].ty, TyKind::Ptr(TY_INT));
    assert_eq!(prog.decls[3].ty.size(), 8);
  }

  #[test]
  fn function_name_is_not_a_variable() {
    let arena = Arena::new();
    let err = parse_src(&arena, "int f() { return 0; } int main() { return f; }").unwrap_err();
    assert_eq!(err.msg, "undefined variable");
  }

  #[test]
  fn missing_semicolon_is_reported() {
    let arena = Arena::new();
    let err = parse_src(&arena, "int main() { return 1 }").unwrap_err();
    assert_eq!(err.msg, "expected ';'");
  }

  #[test]
  fn array_declarators_nest_outside_in() {
    let arena = Arena::new();
    let prog = parse_src(&arena, "int a[2][3];").unwrap();
    // a is an array of 2 arrays of 3 ints: 24 bytes.
    assert_eq!(prog.decls[0].ty.size(), 24);
    let TyKind::Array(inner, 2) = *prog.decls[0].ty else { panic!() };
    assert_eq!(*inner, TyKind::Array(TY_INT, 3));
  }
}
