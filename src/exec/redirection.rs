//! Resolves a [`Command`]'s redirection targets into [`std::process::Stdio`]
//! values. Grounded on the `InputHandle`/`OutputHandle` split used by
//! `other_examples/53e06ac6_jswans33-james-shell__src-executor.rs` — the
//! pack's cleanest expression of "turn a redirection into something
//! `std::process::Command` accepts."

use crate::error::ExecError;
use crate::parser::Command;
use std::fs::{File, OpenOptions};
use std::process::Stdio;

/// What a pipeline stage's stdin should be wired to, before pipe wiring
/// (`InputHandle::Pipe` for the read end of an upstream pipe) is applied
/// by the caller.
pub enum StageStdin {
    Inherit,
    DevNull,
    File(File),
}

impl StageStdin {
    pub fn into_stdio(self) -> Stdio {
        match self {
            StageStdin::Inherit => Stdio::inherit(),
            StageStdin::DevNull => Stdio::null(),
            StageStdin::File(f) => Stdio::from(f),
        }
    }
}

/// What a pipeline stage's stdout should be wired to, before pipe wiring
/// is applied by the caller.
pub enum StageStdout {
    Inherit,
    File(File),
}

impl StageStdout {
    pub fn into_stdio(self) -> Stdio {
        match self {
            StageStdout::Inherit => Stdio::inherit(),
            StageStdout::File(f) => Stdio::from(f),
        }
    }
}

/// Opens `cmd.input_file` for reading, if set. Only meaningful for the
/// first command of a pipeline — the caller is responsible for applying
/// this only there.
pub fn resolve_stdin(cmd: &Command, background_with_no_file: bool) -> Result<StageStdin, ExecError> {
    if let Some(path) = &cmd.input_file {
        let file = File::open(path).map_err(|source| ExecError::Redirection {
            path: path.clone(),
            source,
        })?;
        return Ok(StageStdin::File(file));
    }
    if background_with_no_file {
        return Ok(StageStdin::DevNull);
    }
    Ok(StageStdin::Inherit)
}

/// Opens `cmd.output_file` for writing (truncate or append per
/// `append_mode`), if set. Only meaningful for the last command of a
/// pipeline.
pub fn resolve_stdout(cmd: &Command) -> Result<StageStdout, ExecError> {
    if let Some(path) = &cmd.output_file {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(cmd.append_mode)
            .truncate(!cmd.append_mode)
            .open(path)
            .map_err(|source| ExecError::Redirection {
                path: path.clone(),
                source,
            })?;
        return Ok(StageStdout::File(file));
    }
    Ok(StageStdout::Inherit)
}
