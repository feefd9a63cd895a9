//! `history` — prints the bounded history ring, bash-numbered.

use super::BuiltinContext;
use std::io::Write;

pub fn run(writer: &mut dyn Write, ctx: &mut BuiltinContext) -> i32 {
    let _ = write!(writer, "{}", ctx.state.history.render());
    0
}
