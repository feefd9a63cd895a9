//! Core library for `myshell`: lexer, parser, job table, executor, and
//! signal layer. The REPL loop, interactive line editing, and packaging
//! live in `main.rs`; this crate root exposes the pieces that have
//! invariants worth testing in isolation.

pub mod builtins;
pub mod error;
pub mod exec;
pub mod history;
pub mod job;
pub mod lexer;
pub mod parser;
pub mod signals;

pub use error::ShellError;
pub use exec::{execute, Outcome, ShellState};
pub use job::{Job, JobStatus, JobTable};
pub use lexer::lex;
pub use parser::{parse, Command, Pipeline};
