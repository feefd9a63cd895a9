//! Installs the shell's signal dispositions and runs the SIGCHLD reaper.
//!
//! A raw libc `sigaction` handler cannot safely touch a `Mutex` or a
//! `HashMap`, so the reaping and SIGINT-forwarding logic that spec.md
//! describes as "the SIGCHLD handler" and "the SIGINT handler" is not run
//! from an actual async-signal context here. Instead — the pattern
//! `signal-hook`-based shells in the retrieved pack use (e.g.
//! `Der7777-Custom-Shell`, `johnhenry-bash-backwards`) — the signals are
//! registered with `signal_hook::iterator::Signals` and drained on a
//! dedicated background thread, which is free to lock the job table like
//! any other ordinary code. SIGTSTP is left un-registered with that
//! iterator (nothing to do on delivery) and is additionally set to
//! `SIG_IGN` directly so it never suspends the shell process itself.

use crate::job::JobTable;
use signal_hook::consts::{SIGCHLD, SIGINT, SIGTSTP};
use signal_hook::iterator::Signals;
use std::thread;

/// Ignores SIGTSTP in the shell process: the shell should never suspend,
/// only the foreground child (which owns the terminal) is the intended
/// recipient of Ctrl-Z.
pub fn ignore_sigtstp() {
    unsafe {
        libc::signal(libc::SIGTSTP, libc::SIG_IGN);
    }
}

/// Spawns the background thread that reaps children on SIGCHLD and
/// forwards SIGINT to the terminal's foreground process group. Returns
/// the `Signals` handle; dropping/forgetting it is fine — the thread
/// runs for the lifetime of the process.
pub fn install(jobs: JobTable) -> std::io::Result<thread::JoinHandle<()>> {
    ignore_sigtstp();

    let mut signals = Signals::new([SIGCHLD, SIGINT])?;
    let handle = thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGCHLD => reap_children(&jobs),
                SIGINT => forward_sigint(),
                _ => {}
            }
        }
    });
    Ok(handle)
}

/// Drains every reapable child, one registered job's process group at a
/// time, with `waitpid(-pgid, WNOHANG|WUNTRACED)`.
///
/// Deliberately never calls `waitpid(-1, ...)`: a foreground pipeline
/// isn't registered as a Job until it stops (spec.md's load-bearing
/// invariant), and `fg` temporarily removes a job from the table for the
/// duration of its own blocking resume-wait (see `builtins::jobs_cmd`) —
/// so restricting this loop to `tracked_pgids()` means it can never steal
/// a child out from under a foreground `waitpid` running concurrently on
/// the REPL thread.
fn reap_children(jobs: &JobTable) {
    for pgid in jobs.tracked_pgids() {
        loop {
            let mut status: libc::c_int = 0;
            let pid = unsafe { libc::waitpid(-pgid, &mut status, libc::WNOHANG | libc::WUNTRACED) };
            if pid <= 0 {
                break;
            }

            let job = match jobs.find_job_by_pgid(pgid) {
                Some(job) => job,
                None => continue,
            };

            if unsafe { libc::WIFSTOPPED(status) } {
                jobs.update_status(job.job_id, crate::job::JobStatus::Stopped);
                println!("\n[{}]+  Stopped    {}", job.job_id, job.command);
            } else if unsafe { libc::WIFEXITED(status) } || unsafe { libc::WIFSIGNALED(status) } {
                // Only flip status; `cleanup_jobs` removes it at the next
                // REPL line boundary so `jobs` can show it once.
                jobs.update_status(job.job_id, crate::job::JobStatus::Done);
                log::debug!("reaped job {} (pgid {pgid})", job.job_id);
            }
        }
    }
}

/// Forwards SIGINT to whichever process group currently owns the
/// terminal, unless that group is the shell's own — in which case the
/// shell simply must not kill itself.
fn forward_sigint() {
    let fg_pgid = unsafe { libc::tcgetpgrp(libc::STDIN_FILENO) };
    if fg_pgid == -1 {
        return;
    }
    let shell_pgid = unsafe { libc::getpgrp() };
    if fg_pgid == shell_pgid {
        return;
    }
    unsafe {
        libc::kill(-fg_pgid, libc::SIGINT);
    }
}
