//! Bounded job table: the registry of background/stopped pipelines,
//! queried by built-ins (`jobs`, `fg`, `bg`) and mutated by both the
//! foreground executor and the SIGCHLD-reaper thread (`crate::signals`).

use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

pub const MAX_JOBS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done,
}

impl JobStatus {
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Running => "Running",
            JobStatus::Stopped => "Stopped",
            JobStatus::Done => "Done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: u32,
    pub pgid: libc::pid_t,
    pub command: String,
    pub status: JobStatus,
}

struct Inner {
    jobs: IndexMap<u32, Job>,
    next_id: u32,
}

/// Thread-shared job table. Cheap to clone (an `Arc` handle); the
/// foreground REPL thread and the signal-watcher thread each hold one.
#[derive(Clone)]
pub struct JobTable {
    inner: Arc<Mutex<Inner>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                jobs: IndexMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Registers a new job, allocating the next never-reused job id.
    /// Returns `None` if the table is at capacity.
    pub fn add_job(&self, pgid: libc::pid_t, command: String, status: JobStatus) -> Option<u32> {
        let mut inner = self.inner.lock().unwrap();
        if inner.jobs.len() >= MAX_JOBS {
            return None;
        }
        let job_id = inner.next_id;
        inner.next_id += 1;
        inner.jobs.insert(
            job_id,
            Job {
                job_id,
                pgid,
                command,
                status,
            },
        );
        Some(job_id)
    }

    pub fn remove_job(&self, job_id: u32) {
        self.inner.lock().unwrap().jobs.shift_remove(&job_id);
    }

    /// Re-inserts a job under its original id — used when `fg` resumes a
    /// stopped job and it stops again, so the id survives the round trip
    /// instead of being reallocated by `add_job`.
    pub fn reinsert(&self, job: Job) {
        self.inner.lock().unwrap().jobs.insert(job.job_id, job);
    }

    pub fn find_job(&self, job_id: u32) -> Option<Job> {
        self.inner.lock().unwrap().jobs.get(&job_id).cloned()
    }

    pub fn find_job_by_pgid(&self, pgid: libc::pid_t) -> Option<Job> {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .values()
            .find(|j| j.pgid == pgid)
            .cloned()
    }

    pub fn update_status(&self, job_id: u32, status: JobStatus) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(job) = inner.jobs.get_mut(&job_id) {
            job.status = status;
        }
    }

    pub fn update_status_by_pgid(&self, pgid: libc::pid_t, status: JobStatus) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(job) = inner.jobs.values_mut().find(|j| j.pgid == pgid) {
            job.status = status;
        }
    }

    /// Owned snapshot of every non-`Done` job, in job-id order. Returning
    /// owned data (rather than references into the table, as the source
    /// C implementation's `get_all_jobs(Job *jobs, int max_jobs)` did)
    /// avoids a lifetime tied to a lock that a concurrent `remove_job`
    /// could invalidate.
    pub fn get_all_jobs(&self) -> Vec<Job> {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .values()
            .filter(|j| j.status != JobStatus::Done)
            .cloned()
            .collect()
    }

    /// Purges every `Done` entry. Called once per REPL iteration, before
    /// the next line is read, so `jobs` gets one chance to display a job
    /// that just finished.
    pub fn cleanup_jobs(&self) {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .retain(|_, job| job.status != JobStatus::Done);
    }

    /// pgids of every job currently tracked by the table. The SIGCHLD
    /// reaper thread only ever calls `waitpid` on pgids drawn from this
    /// list — never on `-1` — so it can never steal a child out from
    /// under an executor thread that's blocked in its own `waitpid` for a
    /// pgid not yet (or no longer, during `fg`) registered here.
    pub fn tracked_pgids(&self) -> Vec<libc::pid_t> {
        self.inner.lock().unwrap().jobs.values().map(|j| j.pgid).collect()
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}
