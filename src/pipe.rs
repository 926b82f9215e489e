use crate::builtin::{InvalidArgs, usage_error};
use crate::command::{CommandFactory, CommandLine, ExecutableCommand};
use crate::env::Environment;
use crate::interpreter::{Dispatcher, Factory};
use crate::parser;
use crate::process::{self, Group};
use anyhow::{Context, Result};
use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::wait::WaitStatus;
use nix::unistd::{Pid, close, dup2, pipe};
use std::os::unix::io::{AsRawFd, RawFd};

/// Which output of the first side feeds the second side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeType {
    /// `|`
    Standard,
    /// `|&`
    Error,
}

impl PipeType {
    fn source(self) -> RawFd {
        match self {
            PipeType::Standard => STDOUT_FILENO,
            PipeType::Error => STDERR_FILENO,
        }
    }
}

/// Split a line at its first `|`.
///
/// A `&` right after the bar selects [`PipeType::Error`] and belongs to the
/// operator. Returns `None` when there is no bar.
pub fn split(text: &str) -> Option<(PipeType, &str, &str)> {
    let bar = text.find('|')?;
    let rest = &text[bar + 1..];
    let (kind, rest) = match rest.strip_prefix('&') {
        Some(rest) => (PipeType::Error, rest),
        None => (PipeType::Standard, rest),
    };
    Some((kind, parser::trim(&text[..bar]), parser::trim(rest)))
}

/// Two sub-commands connected by a pipe, each in its own child process.
pub struct PipeCommand {
    line: CommandLine,
    kind: PipeType,
    first: Box<dyn ExecutableCommand>,
    second: Box<dyn ExecutableCommand>,
}

impl CommandFactory for Factory<PipeCommand> {
    fn try_create(
        &self,
        env: &Environment,
        dispatcher: &Dispatcher,
        line: &str,
    ) -> Option<Box<dyn ExecutableCommand>> {
        let text = parser::normalize(line);
        let (kind, first, second) = split(&text)?;
        let line = CommandLine::new(line);
        let sides = if first.is_empty() || second.is_empty() {
            None
        } else {
            dispatcher.create(env, first).zip(dispatcher.create(env, second))
        };
        let Some((first, second)) = sides else {
            let error = usage_error("pipe", "invalid arguments");
            return Some(Box::new(InvalidArgs::new(line, error)));
        };
        Some(Box::new(PipeCommand {
            line,
            kind,
            first,
            second,
        }))
    }
}

impl ExecutableCommand for PipeCommand {
    fn command_line(&self) -> &CommandLine {
        &self.line
    }

    fn execute(self: Box<Self>, env: &mut Environment) -> Result<()> {
        let (writer, reader) = (*self).start(Group::New, env)?;
        let writer_waited = process::wait_foreground(env, writer);
        let reader = reader?;
        let reader_waited = process::wait_foreground(env, reader);
        writer_waited.and(reader_waited)
    }

    /// A pipe nested in another pipe's side. Both sides stay in this
    /// child's process group, so an interrupt that kills the side's group
    /// takes them down as well.
    fn run_as_child(self: Box<Self>, env: &mut Environment) -> i32 {
        let waited = (*self).start(Group::Inherit, env).and_then(|(writer, reader)| {
            let writer_waited = process::wait_stopped_or_exited(writer);
            let reader_waited = reader.and_then(process::wait_stopped_or_exited);
            writer_waited.and(reader_waited)
        });
        match waited {
            Ok(WaitStatus::Exited(_, code)) => code,
            Ok(_) => 1,
            Err(err) => {
                eprintln!("{err:#}");
                1
            }
        }
    }
}

impl PipeCommand {
    /// Fork both sides, then close the parent's pipe ends.
    ///
    /// A failure to fork the reader is returned alongside the writer's pid
    /// so the caller still waits on the writer.
    fn start(self, group: Group, env: &mut Environment) -> Result<(Pid, Result<Pid>)> {
        let PipeCommand {
            kind,
            first,
            second,
            ..
        } = self;
        let (read, write) = pipe().context("smash error: pipe failed")?;
        let ends = [read.as_raw_fd(), write.as_raw_fd()];

        let writer = process::spawn_in(group, || {
            run_side(first, write.as_raw_fd(), kind.source(), ends, env)
        })?;
        let reader = process::spawn_in(group, || {
            run_side(second, read.as_raw_fd(), STDIN_FILENO, ends, env)
        });
        drop(read);
        drop(write);
        log::debug!("{kind:?} pipe: {writer} -> {reader:?}");
        Ok((writer, reader))
    }
}

/// Child body for one side: attach the pipe end, run the command.
///
/// The child never drops the parent's `OwnedFd`s, so the raw ends are
/// closed here by hand.
fn run_side(
    command: Box<dyn ExecutableCommand>,
    end: RawFd,
    onto: RawFd,
    ends: [RawFd; 2],
    env: &mut Environment,
) -> i32 {
    if let Err(errno) = dup2(end, onto) {
        eprintln!("smash error: dup2 failed: {errno}");
        return 1;
    }
    for fd in ends {
        let _ = close(fd);
    }
    command.run_as_child(env)
}
