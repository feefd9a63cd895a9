//! `jobs`, `fg <id>`, `bg <id>` — the built-ins that directly observe and
//! drive the job table and terminal ownership.

use super::BuiltinContext;
use crate::exec::{self, term};
use crate::job::JobStatus;
use std::io::Write;

pub fn jobs(writer: &mut dyn Write, ctx: &mut BuiltinContext) -> i32 {
    for job in ctx.state.jobs.get_all_jobs() {
        let _ = writeln!(writer, "[{}] {} {}", job.job_id, job.status.label(), job.command);
    }
    0
}

fn parse_job_id(args: &[String], name: &str) -> Result<u32, i32> {
    match args.first() {
        Some(arg) => arg.parse::<u32>().map_err(|_| {
            eprintln!("myshell: {name}: {arg}: no such job");
            1
        }),
        None => {
            eprintln!("myshell: {name}: usage: {name} <job_id>");
            Err(1)
        }
    }
}

/// Transfers the terminal to the job's group, `SIGCONT`s it if stopped,
/// and waits on it like the executor's own foreground path.
pub fn fg(args: &[String], ctx: &mut BuiltinContext) -> i32 {
    let job_id = match parse_job_id(args, "fg") {
        Ok(id) => id,
        Err(code) => return code,
    };

    let job = match ctx.state.jobs.find_job(job_id) {
        Some(job) => job,
        None => {
            eprintln!("myshell: fg: {job_id}: no such job");
            return 1;
        }
    };

    if job.status == JobStatus::Stopped {
        unsafe {
            libc::kill(-job.pgid, libc::SIGCONT);
        }
    }

    // Pull the job out of the table for the duration of the resume: the
    // SIGCHLD reaper thread only ever waits on tracked pgids (see
    // `crate::signals::reap_children`), so removing it here is what keeps
    // the reaper from racing this blocking wait for the same group.
    ctx.state.jobs.remove_job(job.job_id);

    let _guard = term::ForegroundGuard::new(job.pgid);
    let result = match exec::wait_for_resumed_group(job.pgid) {
        Ok(exec::GroupWaitOutcome::Exited(code)) => code,
        Ok(exec::GroupWaitOutcome::Stopped) => {
            let mut stopped = job.clone();
            stopped.status = JobStatus::Stopped;
            ctx.state.jobs.reinsert(stopped);
            println!("\n[{}]+  Stopped    {}", job.job_id, job.command);
            0
        }
        Err(e) => {
            eprintln!("myshell: fg: waitpid: {e}");
            1
        }
    };
    result
}

/// Resumes a stopped job in the background: `SIGCONT`s its group and
/// marks it `Running`. Requires the job to currently be `Stopped`.
pub fn bg(args: &[String], ctx: &mut BuiltinContext) -> i32 {
    let job_id = match parse_job_id(args, "bg") {
        Ok(id) => id,
        Err(code) => return code,
    };

    let job = match ctx.state.jobs.find_job(job_id) {
        Some(job) => job,
        None => {
            eprintln!("myshell: bg: {job_id}: no such job");
            return 1;
        }
    };

    if job.status != JobStatus::Stopped {
        eprintln!("myshell: bg: job {job_id} is not stopped");
        return 1;
    }

    unsafe {
        libc::kill(-job.pgid, libc::SIGCONT);
    }
    ctx.state.jobs.update_status(job.job_id, JobStatus::Running);
    println!("[{}]+ {} &", job.job_id, job.command);
    0
}
