use crate::command::CommandLine;
use crate::process;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::waitpid;
use nix::unistd::Pid;
use std::io::{self, Write};

/// A background process tracked by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    id: usize,
    pid: Pid,
    line: CommandLine,
}

impl JobEntry {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.line
    }
}

/// Background jobs in insertion order.
///
/// Ids come from a high-water mark that only grows, so an id is never
/// handed out twice, even after the table has emptied.
#[derive(Debug, Clone, Default)]
pub struct JobsList {
    jobs: Vec<JobEntry>,
    last_id: usize,
}

impl JobsList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pid` as a background job, unless it has already finished.
    ///
    /// Returns the assigned job id.
    pub fn add_job(&mut self, line: CommandLine, pid: Pid) -> Option<usize> {
        if process::has_exited(pid) {
            log::debug!("job {pid} finished before registration");
            return None;
        }
        Some(self.push(line, pid))
    }

    fn push(&mut self, line: CommandLine, pid: Pid) -> usize {
        self.last_id += 1;
        let id = self.last_id;
        log::debug!("job [{id}] {pid}: {line}");
        self.jobs.push(JobEntry { id, pid, line });
        id
    }

    /// Drop every entry whose process is no longer running.
    pub fn remove_finished_jobs(&mut self) {
        self.jobs.retain(|job| {
            let finished = process::has_exited(job.pid);
            if finished {
                log::debug!("job [{}] {} finished", job.id, job.pid);
            }
            !finished
        });
    }

    pub fn get_job_by_id(&self, id: usize) -> Option<&JobEntry> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// The most recently added entry that is still in the table.
    pub fn get_last_job(&self) -> Option<&JobEntry> {
        self.jobs.last()
    }

    pub fn remove_job_by_id(&mut self, id: usize) -> Option<JobEntry> {
        let index = self.jobs.iter().position(|job| job.id == id)?;
        Some(self.jobs.remove(index))
    }

    /// Write `[<id>] <command line>` for every entry.
    pub fn print_jobs_list(&self, out: &mut dyn Write) -> io::Result<()> {
        for job in &self.jobs {
            writeln!(out, "[{}] {}", job.id, job.line)?;
        }
        Ok(())
    }

    /// SIGKILL every job and empty the table.
    ///
    /// A failure on one entry is reported and the rest are still processed.
    /// Every job is killed even if writing the listing fails; the first write
    /// error is returned at the end.
    pub fn kill_all_jobs(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let mut listed = Ok(());
        for job in self.jobs.drain(..) {
            if listed.is_ok() {
                listed = writeln!(out, "{}: {}", job.pid, job.line);
            }
            match signal::kill(job.pid, Signal::SIGKILL) {
                Ok(()) => {
                    let _ = waitpid(job.pid, None);
                }
                Err(errno) => {
                    log::warn!("could not kill job [{}] {}: {errno}", job.id, job.pid);
                    eprintln!("smash error: kill failed: {errno}");
                }
            }
        }
        listed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobEntry> {
        self.jobs.iter()
    }
}
