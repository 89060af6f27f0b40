//! Tokenizing the source text.
//!
//! The token stream is the parser's whole view of the input: identifiers,
//! reserved words and punctuation, decimal literals, and a terminating
//! end-of-input token. Tokens carry byte ranges rather than text.

use crate::CompileError;
use crate::types::token::{Token, TokenKind};

/// Words the parser treats as reserved rather than as identifiers.
const KEYWORDS: &[&str] = &["return", "if", "else", "for", "while", "int", "sizeof"];

fn is_ident_head(c: u8) -> bool {
  c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_tail(c: u8) -> bool {
  is_ident_head(c) || c.is_ascii_digit()
}

fn new_token(kind: TokenKind, loc: usize, len: usize) -> Token {
  Token {
    kind,
    val: 0,
    loc: u32::try_from(loc).expect("source too large"),
    len: u32::try_from(len).expect("token too long"),
  }
}

/// Split the source into tokens. The returned vector always ends with an
/// [`TokenKind::Eof`] token.
pub fn tokenize(src: &str) -> Result<Vec<Token>, CompileError> {
  let bytes = src.as_bytes();
  let mut toks = Vec::new();
  let mut pos = 0;

  while pos < bytes.len() {
    let c = bytes[pos];

    if c.is_ascii_whitespace() {
      pos += 1;
      continue;
    }

    // Numeric literal
    if c.is_ascii_digit() {
      let start = pos;
      let mut val = 0i32;
      while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        val = val.wrapping_mul(10).wrapping_add(i32::from(bytes[pos] - b'0'));
        pos += 1;
      }
      let mut tok = new_token(TokenKind::Num, start, pos - start);
      tok.val = val;
      toks.push(tok);
      continue;
    }

    // Identifier or keyword
    if is_ident_head(c) {
      let start = pos;
      while pos < bytes.len() && is_ident_tail(bytes[pos]) {
        pos += 1;
      }
      toks.push(new_token(TokenKind::Ident, start, pos - start));
      continue;
    }

    // Punctuation
    let rest = &src[pos..];
    if ["==", "!=", "<=", ">="].iter().any(|p| rest.starts_with(p)) {
      toks.push(new_token(TokenKind::Reserved, pos, 2));
      pos += 2;
      continue;
    }
    if c.is_ascii_punctuation() {
      toks.push(new_token(TokenKind::Reserved, pos, 1));
      pos += 1;
      continue;
    }

    return Err(CompileError::lex(pos as u32, "invalid token"));
  }

  toks.push(new_token(TokenKind::Eof, bytes.len(), 0));
  convert_keywords(src, &mut toks);
  Ok(toks)
}

fn convert_keywords(src: &str, toks: &mut [Token]) {
  for tok in toks {
    if tok.kind == TokenKind::Ident && KEYWORDS.contains(&tok.text(src)) {
      tok.kind = TokenKind::Reserved;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src).unwrap().iter().map(|t| t.kind).collect()
  }

  #[test]
  fn lexes_expression() {
    let toks = tokenize("1 + 23*x;").unwrap();
    let texts: Vec<_> = toks.iter().map(|t| t.text("1 + 23*x;")).collect();
    assert_eq!(texts, ["1", "+", "23", "*", "x", ";", ""]);
    assert_eq!(toks[0].val, 1);
    assert_eq!(toks[2].val, 23);
    assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
  }

  #[test]
  fn keywords_are_reserved() {
    use TokenKind::{Eof, Ident, Reserved};
    assert_eq!(kinds("return x"), [Reserved, Ident, Eof]);
    assert_eq!(kinds("sizeof intx int"), [Reserved, Ident, Reserved, Eof]);
  }

  #[test]
  fn two_char_punctuation() {
    let src = "a<=b == c";
    let toks = tokenize(src).unwrap();
    let texts: Vec<_> = toks.iter().map(|t| t.text(src)).collect();
    assert_eq!(texts, ["a", "<=", "b", "==", "c", ""]);
  }

  #[test]
  fn rejects_stray_bytes() {
    // Non-ASCII bytes are not whitespace, digits, identifier characters,
    // or ASCII punctuation.
    let err = tokenize("x \u{e9}").unwrap_err();
    assert_eq!(err.loc, Some(2));
    assert_eq!(err.msg, "invalid token");
  }

  #[test]
  fn underscore_starts_identifier() {
    let src = "_foo9 9bar";
    let toks = tokenize(src).unwrap();
    assert_eq!(toks[0].text(src), "_foo9");
    assert_eq!(toks[0].kind, TokenKind::Ident);
    // A digit ends the number and starts a fresh identifier.
    assert_eq!(toks[1].kind, TokenKind::Num);
    assert_eq!(toks[2].text(src), "bar");
  }
}
