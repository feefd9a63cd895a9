//! Interactive REPL: reads a line, lexes, parses, executes, and loops.
//! Prompt printing and line reading are the external "line source"
//! collaborator spec.md carves out of the core — here backed by
//! `rustyline` rather than a hand-rolled `read_line`, matching the rest
//! of the retrieved pack's shell-shaped crates.

use clap::Parser;
use myshell::exec::{self, Outcome, ShellState};
use myshell::job::JobTable;
use myshell::lexer::ProcessEnv;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

#[derive(Parser)]
#[command(name = "myshell", version, about = "A POSIX-style interactive shell")]
struct Cli;

const PROMPT: &str = "myshell> ";

fn main() {
    let _ = Cli::parse();
    env_logger::init();

    // The shell becomes its own process group leader and takes the
    // terminal so every subsequent `tcsetpgrp` handoff has a well-defined
    // owner to reclaim.
    unsafe {
        let pid = libc::getpid();
        libc::setpgid(pid, pid);
        libc::tcsetpgrp(libc::STDIN_FILENO, pid);
    }

    let jobs = JobTable::new();
    if let Err(e) = myshell::signals::install(jobs.clone()) {
        eprintln!("myshell: failed to install signal handlers: {e}");
    }

    let mut state = ShellState::new(jobs);
    let mut editor = DefaultEditor::new().expect("failed to initialize line editor");
    let mut exit_code = 0;

    loop {
        state.jobs.cleanup_jobs();

        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(&line);
                state.history.add(&line);

                match run_line(&line, &mut state) {
                    Outcome::Continue(_) => {}
                    Outcome::Exit(code) => {
                        exit_code = code;
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("myshell: {e}");
                break;
            }
        }
    }

    std::process::exit(exit_code);
}

fn run_line(line: &str, state: &mut ShellState) -> Outcome {
    let tokens = match myshell::lex(line, &ProcessEnv) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{e}");
            return Outcome::Continue(1);
        }
    };

    if tokens.is_empty() {
        return Outcome::Continue(0);
    }

    let pipeline = match myshell::parse(&tokens) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{e}");
            return Outcome::Continue(1);
        }
    };

    exec::execute(&pipeline, line, state)
}
