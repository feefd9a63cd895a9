//! Terminal foreground ownership (`tcsetpgrp`/`tcgetpgrp`).

/// Hands the terminal to `pgid` on construction and unconditionally
/// reclaims it for `shell_pgid` when dropped — including on every early
/// return out of the executor, since `Drop` runs regardless of how the
/// enclosing scope exits.
pub struct ForegroundGuard {
    shell_pgid: libc::pid_t,
}

impl ForegroundGuard {
    /// Transfers the controlling terminal (on the shell's stdin fd) to
    /// `pgid`. Errors (e.g. stdin is not a tty) are ignored, matching the
    /// source shell's "ignore error if not a terminal" comments.
    pub fn new(pgid: libc::pid_t) -> Self {
        let shell_pgid = unsafe { libc::getpgrp() };
        unsafe {
            libc::tcsetpgrp(libc::STDIN_FILENO, pgid);
        }
        Self { shell_pgid }
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetpgrp(libc::STDIN_FILENO, self.shell_pgid);
        }
    }
}

/// Returns the process group that currently owns the terminal, or `None`
/// if stdin isn't a controlling terminal.
pub fn foreground_pgid() -> Option<libc::pid_t> {
    let pgid = unsafe { libc::tcgetpgrp(libc::STDIN_FILENO) };
    if pgid == -1 {
        None
    } else {
        Some(pgid)
    }
}
