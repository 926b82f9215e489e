//! Process primitives the commands are built from.

use crate::env::Environment;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork, setpgid};
use std::io::Write;

/// Which process group a forked child lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// A new group led by the child. Signals to the shell's group miss it.
    New,
    /// The caller's group, so a signal to that group reaches the child too.
    Inherit,
}

/// Fork a child that detaches into its own process group and runs `child`.
///
/// The closure's return value becomes the child's exit status; the child
/// never returns into the caller. The parent gets the child's pid.
pub fn spawn<F>(child: F) -> Result<Pid>
where
    F: FnOnce() -> i32,
{
    spawn_in(Group::New, child)
}

/// Like [`spawn`], with the child's process group chosen by `group`.
pub fn spawn_in<F>(group: Group, child: F) -> Result<Pid>
where
    F: FnOnce() -> i32,
{
    // Buffered output would otherwise be written twice.
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    // SAFETY: the shell drives children from a single control thread.
    match unsafe { fork() }.context("smash error: fork failed")? {
        ForkResult::Child => {
            if group == Group::New {
                if let Err(errno) = setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
                    eprintln!("smash error: setpgrp failed: {errno}");
                    exit_child(1);
                }
            }
            let code = child();
            exit_child(code)
        }
        ForkResult::Parent { child } => {
            if group == Group::New {
                // Set from both sides: whichever runs first creates the group.
                let _ = setpgid(child, child);
            }
            log::debug!("forked child {child} ({group:?} group)");
            Ok(child)
        }
    }
}

/// Leave a forked child without running the parent's destructors.
pub fn exit_child(code: i32) -> ! {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    // SAFETY: _exit is async-signal-safe and never returns.
    unsafe { nix::libc::_exit(code) }
}

/// Block until `pid` exits or stops.
pub fn wait_stopped_or_exited(pid: Pid) -> Result<WaitStatus> {
    let status = waitpid(pid, Some(WaitPidFlag::WUNTRACED)).context("smash error: waitpid failed")?;
    log::debug!("waited on {pid}: {status:?}");
    Ok(status)
}

/// Wait on `pid` as the foreground process.
///
/// The pid sits in the foreground register for the duration of the wait so
/// the interrupt handler can kill it. The register is cleared afterwards and
/// any interrupt that arrived meanwhile is reported.
pub fn wait_foreground(env: &Environment, pid: Pid) -> Result<()> {
    env.foreground.set(pid);
    let waited = wait_stopped_or_exited(pid);
    env.foreground.clear();
    let _ = env.foreground.report_interrupt(&mut std::io::stdout());
    waited.map(|_| ())
}

/// Non-blocking check whether `pid` has finished.
///
/// A finished child is reaped by the check. A pid that is not our child
/// (a forked copy of the shell looking at the parent's jobs, or a child
/// reaped elsewhere) cannot be waited on; it counts as finished only once
/// the process no longer exists.
pub fn has_exited(pid: Pid) -> bool {
    match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(..) | WaitStatus::Signaled(..)) => true,
        Ok(_) => false,
        Err(Errno::ECHILD) => signal::kill(pid, None) == Err(Errno::ESRCH),
        Err(errno) => {
            log::warn!("status of {pid} unknown: {errno}");
            false
        }
    }
}
