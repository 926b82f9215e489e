//! Interrupt handling.
//!
//! The SIGINT handler must not allocate, lock or print. It only touches
//! the atomics of a [`ForegroundRegister`]; the control thread picks up the
//! outcome later with [`ForegroundRegister::take_interrupt`] and reports it.

use anyhow::{Context, Result, anyhow};
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::Pid;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};

/// Register value meaning "no foreground child".
pub const NO_FOREGROUND: i32 = -1;

static REGISTER: OnceLock<Arc<ForegroundRegister>> = OnceLock::new();

/// The "current foreground process" slot shared with the signal handler.
#[derive(Debug)]
pub struct ForegroundRegister {
    pid: AtomicI32,
    interrupted: AtomicBool,
    killed: AtomicI32,
    kill_errno: AtomicI32,
}

/// What the last interrupt did, as seen by the control thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// No foreground child was running.
    Idle,
    Killed(Pid),
    KillFailed(Pid, Errno),
}

impl Default for ForegroundRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundRegister {
    pub fn new() -> Self {
        Self {
            pid: AtomicI32::new(NO_FOREGROUND),
            interrupted: AtomicBool::new(false),
            killed: AtomicI32::new(NO_FOREGROUND),
            kill_errno: AtomicI32::new(0),
        }
    }

    pub fn set(&self, pid: Pid) {
        self.pid.store(pid.as_raw(), Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.pid.store(NO_FOREGROUND, Ordering::SeqCst);
    }

    pub fn get(&self) -> Option<Pid> {
        match self.pid.load(Ordering::SeqCst) {
            NO_FOREGROUND => None,
            raw => Some(Pid::from_raw(raw)),
        }
    }

    /// Body of the SIGINT handler. Async-signal-safe.
    ///
    /// Takes the foreground pid out of the register and SIGKILLs its
    /// process group, recording the result for the control thread. Every
    /// foreground pid leads its own group, so the group holds the process
    /// and anything it started in that group.
    pub fn interrupt(&self) {
        let pid = self.pid.swap(NO_FOREGROUND, Ordering::SeqCst);
        if pid != NO_FOREGROUND {
            match signal::killpg(Pid::from_raw(pid), Signal::SIGKILL) {
                Ok(()) => self.kill_errno.store(0, Ordering::SeqCst),
                Err(errno) => self.kill_errno.store(errno as i32, Ordering::SeqCst),
            }
        }
        self.killed.store(pid, Ordering::SeqCst);
        self.interrupted.store(true, Ordering::SeqCst);
    }

    /// Consume the outcome of the last interrupt, if one arrived.
    pub fn take_interrupt(&self) -> Option<Interrupt> {
        if !self.interrupted.swap(false, Ordering::SeqCst) {
            return None;
        }
        let pid = self.killed.swap(NO_FOREGROUND, Ordering::SeqCst);
        if pid == NO_FOREGROUND {
            return Some(Interrupt::Idle);
        }
        let pid = Pid::from_raw(pid);
        match self.kill_errno.swap(0, Ordering::SeqCst) {
            0 => Some(Interrupt::Killed(pid)),
            errno => Some(Interrupt::KillFailed(pid, Errno::from_raw(errno))),
        }
    }

    /// Print a pending interrupt, if any.
    pub fn report_interrupt(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let Some(interrupt) = self.take_interrupt() else {
            return Ok(());
        };
        writeln!(out, "smash: got ctrl-C")?;
        match interrupt {
            Interrupt::Idle => {}
            Interrupt::Killed(pid) => {
                log::info!("interrupt killed foreground process {pid}");
                writeln!(out, "smash: process {pid} was killed")?;
            }
            Interrupt::KillFailed(pid, errno) => {
                log::warn!("interrupt could not kill {pid}: {errno}");
                eprintln!("smash error: kill failed: {errno}");
            }
        }
        out.flush()
    }
}

extern "C" fn handle_sigint(_signal: nix::libc::c_int) {
    if let Some(register) = REGISTER.get() {
        register.interrupt();
    }
}

/// Route SIGINT to `register` for the rest of the process's life.
pub fn install(register: Arc<ForegroundRegister>) -> Result<()> {
    REGISTER
        .set(register)
        .map_err(|_| anyhow!("smash error: interrupt handler already installed"))?;
    let action = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only performs atomic operations and kill(2).
    unsafe { signal::sigaction(Signal::SIGINT, &action) }
        .context("smash error: sigaction failed")?;
    log::info!("SIGINT handler installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::wait::{WaitStatus, waitpid};
    use crate::process;

    #[test]
    fn test_interrupt_without_foreground_is_only_acknowledged() {
        let register = ForegroundRegister::new();
        assert_eq!(register.take_interrupt(), None);

        register.interrupt();
        assert_eq!(register.take_interrupt(), Some(Interrupt::Idle));
        assert_eq!(register.take_interrupt(), None);

        let mut out = Vec::new();
        register.interrupt();
        register.report_interrupt(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "smash: got ctrl-C\n");
    }

    #[test]
    fn test_interrupt_kills_foreground_and_clears_register() {
        let pid = process::spawn(|| {
            std::thread::sleep(std::time::Duration::from_secs(30));
            0
        })
        .expect("spawn");

        let register = ForegroundRegister::new();
        register.set(pid);
        assert_eq!(register.get(), Some(pid));

        register.interrupt();
        assert_eq!(register.get(), None);

        let status = waitpid(pid, None).expect("waitpid");
        assert_eq!(status, WaitStatus::Signaled(pid, Signal::SIGKILL, false));

        let mut out = Vec::new();
        register.report_interrupt(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("smash: got ctrl-C\nsmash: process {pid} was killed\n")
        );
    }
}
