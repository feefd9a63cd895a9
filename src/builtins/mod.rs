//! Built-in dispatch: `is_builtin`/`execute_builtin`, the external
//! interface spec.md §6 names. Most built-ins are plain domain logic
//! (file operations, printing) and only `cd`, `exit`, `fg`, `bg`, `jobs`,
//! `history`, `export`, `unset` touch the core's shared state
//! ([`crate::exec::ShellState`]).

mod cd;
mod export_cmd;
mod history_cmd;
mod jobs_cmd;
mod unset_cmd;

use crate::exec::{Outcome, ShellState};
use std::io::{Read, Write};

/// Mutable access to the pieces of shell state a built-in may need.
pub struct BuiltinContext<'a> {
    pub state: &'a mut ShellState,
}

const BUILTINS: &[&str] = &[
    "cd", "pwd", "exit", "echo", "mkdir", "rmdir", "touch", "rm", "cat", "ls", "jobs", "fg", "bg",
    "history", "export", "unset",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Runs a built-in with the shell's own stdio, returning whether the
/// shell should continue or exit.
pub fn execute_builtin(argv: &[String], ctx: &mut BuiltinContext) -> Outcome {
    let mut stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    match dispatch(argv, &mut stdin, &mut stdout, ctx) {
        Dispatch::Continue(code) => Outcome::Continue(code),
        Dispatch::Exit(code) => Outcome::Exit(code),
    }
}

/// Runs a built-in mid-pipeline, with explicit stdin/stdout. `exit`
/// cannot actually terminate the shell from here (it may be running on a
/// detached thread) — its requested code is still returned.
pub fn execute_builtin_io(
    argv: &[String],
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    ctx: &mut BuiltinContext,
) -> i32 {
    match dispatch(argv, reader, writer, ctx) {
        Dispatch::Continue(code) | Dispatch::Exit(code) => code,
    }
}

enum Dispatch {
    Continue(i32),
    Exit(i32),
}

fn dispatch(
    argv: &[String],
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    ctx: &mut BuiltinContext,
) -> Dispatch {
    let args = &argv[1..];
    match argv[0].as_str() {
        "cd" => Dispatch::Continue(cd::run(args)),
        "pwd" => Dispatch::Continue(cmd_pwd(writer)),
        "exit" => Dispatch::Exit(args.first().and_then(|s| s.parse().ok()).unwrap_or(0)),
        "echo" => Dispatch::Continue(cmd_echo(args, writer)),
        "mkdir" => Dispatch::Continue(cmd_mkdir(args)),
        "rmdir" => Dispatch::Continue(cmd_rmdir(args)),
        "touch" => Dispatch::Continue(cmd_touch(args)),
        "rm" => Dispatch::Continue(cmd_rm(args)),
        "cat" => Dispatch::Continue(cmd_cat(args, reader, writer)),
        "ls" => Dispatch::Continue(cmd_ls(args, writer)),
        "jobs" => Dispatch::Continue(jobs_cmd::jobs(writer, ctx)),
        "fg" => Dispatch::Continue(jobs_cmd::fg(args, ctx)),
        "bg" => Dispatch::Continue(jobs_cmd::bg(args, ctx)),
        "history" => Dispatch::Continue(history_cmd::run(writer, ctx)),
        "export" => Dispatch::Continue(export_cmd::run(args)),
        "unset" => Dispatch::Continue(unset_cmd::run(args)),
        other => {
            eprintln!("myshell: {other}: not a builtin");
            Dispatch::Continue(1)
        }
    }
}

fn cmd_pwd(writer: &mut dyn Write) -> i32 {
    match std::env::current_dir() {
        Ok(path) => {
            let _ = writeln!(writer, "{}", path.display());
            0
        }
        Err(e) => {
            eprintln!("myshell: pwd: {e}");
            1
        }
    }
}

fn cmd_echo(args: &[String], writer: &mut dyn Write) -> i32 {
    let (no_newline, words) = if args.first().map(|s| s.as_str()) == Some("-n") {
        (true, &args[1..])
    } else {
        (false, args)
    };
    let line = words.join(" ");
    if no_newline {
        let _ = write!(writer, "{line}");
    } else {
        let _ = writeln!(writer, "{line}");
    }
    0
}

fn cmd_mkdir(args: &[String]) -> i32 {
    let mut status = 0;
    for path in args {
        if let Err(e) = std::fs::create_dir(path) {
            eprintln!("myshell: mkdir: {path}: {e}");
            status = 1;
        }
    }
    status
}

fn cmd_rmdir(args: &[String]) -> i32 {
    let mut status = 0;
    for path in args {
        if let Err(e) = std::fs::remove_dir(path) {
            eprintln!("myshell: rmdir: {path}: {e}");
            status = 1;
        }
    }
    status
}

/// Matches the source shell: opens (creating if absent) and immediately
/// closes the file. Does not update the mtime of an already-existing
/// file — preserved as documented behavior, not fixed (spec.md §9).
fn cmd_touch(args: &[String]) -> i32 {
    let mut status = 0;
    for path in args {
        if let Err(e) = std::fs::OpenOptions::new().create(true).write(true).open(path) {
            eprintln!("myshell: touch: {path}: {e}");
            status = 1;
        }
    }
    status
}

fn cmd_rm(args: &[String]) -> i32 {
    let mut status = 0;
    for path in args {
        if let Err(e) = std::fs::remove_file(path) {
            eprintln!("myshell: rm: {path}: {e}");
            status = 1;
        }
    }
    status
}

fn cmd_cat(args: &[String], reader: &mut dyn Read, writer: &mut dyn Write) -> i32 {
    if args.is_empty() {
        let mut buf = Vec::new();
        if reader.read_to_end(&mut buf).is_ok() {
            let _ = writer.write_all(&buf);
        }
        return 0;
    }
    let mut status = 0;
    for path in args {
        match std::fs::read(path) {
            Ok(bytes) => {
                let _ = writer.write_all(&bytes);
            }
            Err(e) => {
                eprintln!("myshell: cat: {path}: {e}");
                status = 1;
            }
        }
    }
    status
}

fn cmd_ls(args: &[String], writer: &mut dyn Write) -> i32 {
    let target = args.first().map(|s| s.as_str()).unwrap_or(".");
    let entries = match std::fs::read_dir(target) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("myshell: ls: {target}: {e}");
            return 1;
        }
    };

    let mut names: Vec<(String, bool)> = Vec::new();
    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        names.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
    }
    names.sort_by(|a, b| a.0.cmp(&b.0));

    for (name, is_dir) in names {
        if is_dir {
            let _ = writeln!(writer, "\x1b[34m{name}\x1b[0m");
        } else {
            let _ = writeln!(writer, "{name}");
        }
    }
    0
}
