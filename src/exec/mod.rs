//! Drives one parsed [`Pipeline`]: fork/exec orchestration, pipe wiring,
//! redirection, process-group assignment, terminal handoff, and waitpid
//! semantics. The single-command and pipeline paths share one body, per
//! spec.md §4.4.

pub mod redirection;
pub mod term;

use crate::builtins::{self, BuiltinContext};
use crate::error::ExecError;
use crate::job::{JobStatus, JobTable};
use crate::parser::{Command, Pipeline};
use redirection::{resolve_stdin, resolve_stdout, StageStdin, StageStdout};
use std::io::Write;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command as StdCommand, Stdio};

/// Shared, mutable shell state threaded through both built-ins and the
/// executor.
pub struct ShellState {
    pub jobs: JobTable,
    pub history: crate::history::History,
}

impl ShellState {
    pub fn new(jobs: JobTable) -> Self {
        Self {
            jobs,
            history: crate::history::History::new(),
        }
    }
}

/// Executes one pipeline, returning its exit status (or `None` if the
/// pipeline requested the shell itself exit, carrying the exit code).
pub enum Outcome {
    Continue(i32),
    Exit(i32),
}

pub fn execute(pipeline: &Pipeline, command_text: &str, state: &mut ShellState) -> Outcome {
    if pipeline.commands.len() == 1 && !pipeline.background {
        let cmd = &pipeline.commands[0];
        if builtins::is_builtin(&cmd.argv[0]) {
            return run_builtin_in_shell(cmd, state);
        }
    }
    Outcome::Continue(run_pipeline(pipeline, command_text, state))
}

/// Runs a lone built-in directly in the shell process, with redirections
/// applied to (and restored from) the shell's own stdin/stdout — the only
/// way `cd`, `exit`, `export`, `unset` can have an observable effect.
fn run_builtin_in_shell(cmd: &Command, state: &mut ShellState) -> Outcome {
    let saved_stdin = dup_fd(libc::STDIN_FILENO);
    let saved_stdout = dup_fd(libc::STDOUT_FILENO);

    let mut open_failure = None;
    if let Some(path) = &cmd.input_file {
        match resolve_stdin(cmd, false) {
            Ok(StageStdin::File(file)) => {
                redirect_fd(file.as_raw_fd(), libc::STDIN_FILENO);
            }
            Ok(_) => {}
            Err(e) => open_failure = Some((path.clone(), e)),
        }
    }
    if open_failure.is_none() {
        if let Some(path) = &cmd.output_file {
            match resolve_stdout(cmd) {
                Ok(StageStdout::File(file)) => {
                    redirect_fd(file.as_raw_fd(), libc::STDOUT_FILENO);
                }
                Ok(_) => {}
                Err(e) => open_failure = Some((path.clone(), e)),
            }
        }
    }

    let outcome = if let Some((path, e)) = open_failure {
        eprintln!("{e}");
        log::warn!("redirection failed for {path}: {e}");
        Outcome::Continue(1)
    } else {
        let mut ctx = BuiltinContext { state };
        builtins::execute_builtin(&cmd.argv, &mut ctx)
    };

    restore_fd(saved_stdin, libc::STDIN_FILENO);
    restore_fd(saved_stdout, libc::STDOUT_FILENO);

    outcome
}

fn dup_fd(fd: libc::c_int) -> Option<OwnedFd> {
    let dup = unsafe { libc::dup(fd) };
    if dup < 0 {
        None
    } else {
        Some(unsafe { OwnedFd::from_raw_fd(dup) })
    }
}

fn restore_fd(saved: Option<OwnedFd>, target: libc::c_int) {
    if let Some(saved) = saved {
        unsafe {
            libc::dup2(saved.as_raw_fd(), target);
        }
    }
}

fn redirect_fd(source: libc::c_int, target: libc::c_int) {
    unsafe {
        libc::dup2(source, target);
    }
}

/// Runs the full fork/exec/pipe/job-control path for `pipeline`.
fn run_pipeline(pipeline: &Pipeline, command_text: &str, state: &mut ShellState) -> i32 {
    let n = pipeline.commands.len();
    let mut pipeline_pgid: Option<libc::pid_t> = None;
    let mut children: Vec<Child> = Vec::with_capacity(n);
    let mut builtin_threads: Vec<std::thread::JoinHandle<()>> = Vec::new();
    let mut prev_read: Option<OwnedFd> = None;
    let mut last_exit = 0;
    let mut last_stage_is_builtin = false;

    for (i, cmd) in pipeline.commands.iter().enumerate() {
        let is_last = i == n - 1;
        let is_builtin = builtins::is_builtin(&cmd.argv[0]);
        if is_last {
            last_stage_is_builtin = is_builtin;
        }

        let (pipe_write, next_read) = if !is_last {
            match make_pipe() {
                Ok((r, w)) => (Some(w), Some(r)),
                Err(e) => {
                    eprintln!("{}", ExecError::Pipe(e));
                    wait_all(&mut children);
                    return 1;
                }
            }
        } else {
            (None, None)
        };

        let stdin_src = if i == 0 {
            match resolve_stdin(cmd, pipeline.background && cmd.input_file.is_none()) {
                Ok(s) => Some(s),
                Err(e) => {
                    eprintln!("{e}");
                    wait_all(&mut children);
                    return 1;
                }
            }
        } else {
            None
        };

        let stdout_src = if is_last {
            match resolve_stdout(cmd) {
                Ok(s) => Some(s),
                Err(e) => {
                    eprintln!("{e}");
                    wait_all(&mut children);
                    return 1;
                }
            }
        } else {
            None
        };

        if is_builtin {
            // Builtins run in-process; on a background thread for every
            // non-last stage so the pipe has a reader before the next
            // stage is spawned (avoids deadlocking on a full OS pipe).
            let stdin_reader = build_input_reader(prev_read.take(), stdin_src);
            let stdout_writer = build_output_writer(pipe_write, stdout_src);
            let argv = cmd.argv.clone();
            let jobs = state.jobs.clone();

            if is_last {
                let mut local_state = ShellState::new(jobs);
                let mut ctx = BuiltinContext {
                    state: &mut local_state,
                };
                last_exit = run_builtin_piped(&argv, stdin_reader, stdout_writer, &mut ctx);
            } else {
                builtin_threads.push(std::thread::spawn(move || {
                    let mut local_state = ShellState::new(jobs);
                    let mut ctx = BuiltinContext {
                        state: &mut local_state,
                    };
                    let _ = run_builtin_piped(&argv, stdin_reader, stdout_writer, &mut ctx);
                }));
            }
        } else {
            let mut process = StdCommand::new(&cmd.argv[0]);
            process.args(&cmd.argv[1..]);

            let captured_pgid = pipeline_pgid;
            unsafe {
                process.pre_exec(move || {
                    // Reset inherited dispositions: SIG_IGN survives exec,
                    // so without this children would also ignore Ctrl-Z
                    // and Ctrl-\ just like the shell (spec.md §9).
                    for &sig in &[libc::SIGINT, libc::SIGTSTP, libc::SIGQUIT, libc::SIGPIPE] {
                        if libc::signal(sig, libc::SIG_DFL) == libc::SIG_ERR {
                            return Err(std::io::Error::last_os_error());
                        }
                    }
                    let target = captured_pgid.unwrap_or(0);
                    if libc::setpgid(0, target) != 0 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }

            let stdin_stdio = match (prev_read.take(), stdin_src) {
                (Some(reader), _) => Stdio::from(reader),
                (None, Some(s)) => s.into_stdio(),
                (None, None) => Stdio::inherit(),
            };
            let stdout_stdio = match (pipe_write, stdout_src) {
                (Some(writer), _) => Stdio::from(writer),
                (None, Some(s)) => s.into_stdio(),
                (None, None) => Stdio::inherit(),
            };

            process.stdin(stdin_stdio).stdout(stdout_stdio).stderr(Stdio::inherit());

            let child = match process.spawn() {
                Ok(c) => c,
                Err(e) => {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        eprintln!("myshell: {}: command not found", cmd.argv[0]);
                    } else {
                        eprintln!("myshell: {}: {e}", cmd.argv[0]);
                    }
                    log::warn!("spawn failed for {}: {e}", cmd.argv[0]);
                    kill_all(&children);
                    wait_all(&mut children);
                    return 1;
                }
            };
            log::debug!("spawned {} as pid {}", cmd.argv[0], child.id());

            if pipeline_pgid.is_none() {
                let pid = child.id() as libc::pid_t;
                unsafe {
                    libc::setpgid(pid, pid);
                }
                pipeline_pgid = Some(pid);
                log::debug!("pipeline pgid set to {pid}");
                if !pipeline.background {
                    unsafe {
                        libc::tcsetpgrp(libc::STDIN_FILENO, pid);
                    }
                }
            } else if let Some(pgid) = pipeline_pgid {
                unsafe {
                    libc::setpgid(child.id() as libc::pid_t, pgid);
                }
            }

            children.push(child);
        }

        prev_read = next_read;
    }

    if pipeline.background {
        for handle in builtin_threads {
            drop(handle); // detach: writers close their pipe end on drop, giving EOF downstream
        }
        if let Some(last) = children.pop() {
            let pgid = pipeline_pgid.unwrap_or(last.id() as libc::pid_t);
            match state.jobs.add_job(pgid, command_text.to_string(), JobStatus::Running) {
                Some(id) => println!("[{id}] {pgid}"),
                None => eprintln!("myshell: job table is full"),
            }
            drop(last); // may leave short-lived zombies until SIGCHLD reaps them
        }
        unsafe {
            libc::tcsetpgrp(libc::STDIN_FILENO, libc::getpgrp());
        }
        return 0;
    }

    for handle in builtin_threads {
        let _ = handle.join();
    }

    if children.is_empty() {
        return last_exit;
    }

    let fg_pgid = pipeline_pgid.unwrap_or(children[0].id() as libc::pid_t);
    let _guard = term::ForegroundGuard::new(fg_pgid);

    let last_pid = children.last().unwrap().id() as libc::pid_t;
    let child_pids: Vec<libc::pid_t> = children.iter().map(|c| c.id() as libc::pid_t).collect();

    match wait_for_group(&child_pids, last_pid) {
        // When the pipeline's last stage is a builtin, it already ran
        // in-process above and `last_exit` holds its real status; `code`
        // here is just the last *external* (non-last) stage's status,
        // which spec.md §8 does not want reported.
        Ok(GroupWaitOutcome::Exited(code)) => {
            if last_stage_is_builtin {
                last_exit
            } else {
                code
            }
        }
        Ok(GroupWaitOutcome::Stopped) => {
            let pgid = fg_pgid;
            match state
                .jobs
                .add_job(pgid, command_text.to_string(), JobStatus::Stopped)
            {
                Some(id) => println!("\n[{id}]+  Stopped    {command_text}"),
                None => eprintln!("myshell: job table is full"),
            }
            // `std::process::Child` has no `Drop` impl that waits, so
            // letting `children` fall out of scope here is safe: the
            // group is now tracked by the job table and reaped later by
            // the SIGCHLD thread, with no risk of a double `wait()`.
            0
        }
        Err(e) => {
            eprintln!("{}", ExecError::Wait(e));
            1
        }
    }
}

pub(crate) enum GroupWaitOutcome {
    Exited(i32),
    Stopped,
}

/// Waits on a job's whole process group until nothing is left to reap
/// (`ECHILD`) or the group is re-stopped, without needing to know which
/// member pid is "last" — used by the `fg` builtin, which only has a
/// `pgid` and a command string to work with (spec.md §4.3's `Job` has no
/// per-member pid list). The last pid observed to exit stands in for
/// "the last stage", matching the common case where the job is a single
/// external command or a pipeline whose downstream stages have already
/// exited via SIGPIPE.
pub(crate) fn wait_for_resumed_group(pgid: libc::pid_t) -> std::io::Result<GroupWaitOutcome> {
    let mut last_code = None;
    loop {
        let mut status: libc::c_int = 0;
        let waited = unsafe { libc::waitpid(-pgid, &mut status, libc::WUNTRACED) };
        if waited < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            if err.raw_os_error() == Some(libc::ECHILD) {
                break;
            }
            return Err(err);
        }

        if unsafe { libc::WIFSTOPPED(status) } {
            return Ok(GroupWaitOutcome::Stopped);
        }

        let code = if unsafe { libc::WIFEXITED(status) } {
            unsafe { libc::WEXITSTATUS(status) }
        } else if unsafe { libc::WIFSIGNALED(status) } {
            128 + unsafe { libc::WTERMSIG(status) }
        } else {
            1
        };
        last_code = Some(code);
    }
    Ok(GroupWaitOutcome::Exited(last_code.unwrap_or(0)))
}

/// Waits (blocking, `WUNTRACED`) on only the pipeline's LAST stage, then
/// drains every other stage with a single non-blocking `WNOHANG|WUNTRACED`
/// pass. Blocking on the whole group until every pid has been reaped would
/// hang the shell on a misbehaving upstream stage that outlives the last
/// one (e.g. `sleep 10 | true`) — spec.md §4.4 only wants the group's exit
/// status to track the last stage, and the rest reaped without blocking.
fn wait_for_group(pids: &[libc::pid_t], last_pid: libc::pid_t) -> std::io::Result<GroupWaitOutcome> {
    let mut status: libc::c_int = 0;
    loop {
        let waited = unsafe { libc::waitpid(last_pid, &mut status, libc::WUNTRACED) };
        if waited < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err);
        }
        break;
    }

    if unsafe { libc::WIFSTOPPED(status) } {
        return Ok(GroupWaitOutcome::Stopped);
    }

    let code = if unsafe { libc::WIFEXITED(status) } {
        unsafe { libc::WEXITSTATUS(status) }
    } else if unsafe { libc::WIFSIGNALED(status) } {
        128 + unsafe { libc::WTERMSIG(status) }
    } else {
        1
    };

    for &pid in pids {
        if pid == last_pid {
            continue;
        }
        let mut other_status: libc::c_int = 0;
        unsafe {
            libc::waitpid(pid, &mut other_status, libc::WNOHANG | libc::WUNTRACED);
        }
    }

    Ok(GroupWaitOutcome::Exited(code))
}

fn make_pipe() -> std::io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

fn kill_all(children: &[Child]) {
    for child in children {
        unsafe {
            libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
        }
    }
}

fn wait_all(children: &mut Vec<Child>) {
    for mut child in children.drain(..) {
        let _ = child.wait();
    }
}

/// A builtin's input when running mid-pipeline: either an upstream pipe
/// or (for the first stage) a redirected file / the shell's own stdin.
enum BuiltinInput {
    Stdin,
    File(std::fs::File),
    Pipe(std::fs::File),
}

impl std::io::Read for BuiltinInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            BuiltinInput::Stdin => std::io::stdin().read(buf),
            BuiltinInput::File(f) => f.read(buf),
            BuiltinInput::Pipe(f) => f.read(buf),
        }
    }
}

enum BuiltinOutput {
    Stdout,
    File(std::fs::File),
    Pipe(std::fs::File),
}

impl std::io::Write for BuiltinOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            BuiltinOutput::Stdout => std::io::stdout().write(buf),
            BuiltinOutput::File(f) => f.write(buf),
            BuiltinOutput::Pipe(f) => f.write(buf),
        }
    }
    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            BuiltinOutput::Stdout => std::io::stdout().flush(),
            BuiltinOutput::File(f) => f.flush(),
            BuiltinOutput::Pipe(f) => f.flush(),
        }
    }
}

fn build_input_reader(prev_read: Option<OwnedFd>, stdin_src: Option<StageStdin>) -> BuiltinInput {
    if let Some(fd) = prev_read {
        return BuiltinInput::Pipe(std::fs::File::from(fd));
    }
    match stdin_src {
        Some(StageStdin::File(f)) => BuiltinInput::File(f),
        Some(StageStdin::DevNull) => {
            BuiltinInput::File(std::fs::File::open("/dev/null").expect("/dev/null always exists"))
        }
        _ => BuiltinInput::Stdin,
    }
}

fn build_output_writer(pipe_write: Option<OwnedFd>, stdout_src: Option<StageStdout>) -> BuiltinOutput {
    if let Some(fd) = pipe_write {
        return BuiltinOutput::Pipe(std::fs::File::from(fd));
    }
    match stdout_src {
        Some(StageStdout::File(f)) => BuiltinOutput::File(f),
        _ => BuiltinOutput::Stdout,
    }
}

fn run_builtin_piped(
    argv: &[String],
    mut input: BuiltinInput,
    mut output: BuiltinOutput,
    ctx: &mut BuiltinContext,
) -> i32 {
    let code = builtins::execute_builtin_io(argv, &mut input, &mut output, ctx);
    let _ = output.flush();
    code
}
