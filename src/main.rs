//! The charmcc command line: `charmcc [--debug] <source>`.
//!
//! The single positional argument is the program text itself, not a file
//! name. Assembly (or, with `--debug`, the AST/IR dump) goes to stdout;
//! diagnostics go to stderr and nothing is written to stdout after one.

use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
  let args: Vec<String> = env::args().collect();
  let prog = args.first().map_or("charmcc", String::as_str);

  let (debug, src) = match &args[1..] {
    [src] => (false, src),
    [flag, src] if flag == "--debug" => (true, src),
    [flag, _] => {
      eprintln!("{prog}: unknown flag '{flag}'");
      return ExitCode::FAILURE;
    }
    _ => {
      eprintln!("{prog}: invalid number of arguments");
      return ExitCode::FAILURE;
    }
  };

  let result = if debug { charmcc::debug_dump(src) } else { charmcc::compile(src) };
  match result {
    Ok(out) => {
      print!("{out}");
      ExitCode::SUCCESS
    }
    Err(err) => {
      eprintln!("{}", err.render(src));
      ExitCode::FAILURE
    }
  }
}
