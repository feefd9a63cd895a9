//! Error types shared by the lexer, parser, and executor.

use thiserror::Error;

/// Errors that abort a single input line. Every variant maps to a
/// diagnostic printed to stderr; the REPL always recovers to the next
/// prompt after one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("myshell: unterminated single quote")]
    UnterminatedSingleQuote,

    #[error("myshell: unterminated double quote")]
    UnterminatedDoubleQuote,

    #[error("myshell: syntax error near unexpected token '{0}'")]
    SyntaxErrorNear(String),

    #[error("myshell: multiple input redirections")]
    MultipleInputRedirections,

    #[error("myshell: multiple output redirections")]
    MultipleOutputRedirections,

    #[error("myshell: & must be at end of command")]
    AmpersandNotAtEnd,
}

/// Resource and spawn failures encountered while the executor drives a
/// pipeline. These are reported to stderr and abort only the offending
/// pipeline, not the REPL.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("myshell: {path}: {source}")]
    Redirection {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("myshell: pipe: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("myshell: fork: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("myshell: waitpid: {0}")]
    Wait(#[source] std::io::Error),

    #[error("myshell: job table is full")]
    JobTableFull,
}
