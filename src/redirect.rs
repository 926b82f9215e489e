use crate::builtin::{InvalidArgs, usage_error};
use crate::command::{CommandFactory, CommandLine, ExecutableCommand};
use crate::env::Environment;
use crate::interpreter::{Dispatcher, Factory};
use crate::parser;
use anyhow::{Context, Result};
use nix::fcntl::{FcntlArg, OFlag, fcntl, open};
use nix::libc::STDOUT_FILENO;
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};
use std::io::Write;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// How the target file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionMode {
    /// `>`: truncate or create.
    Override,
    /// `>>`: create or extend.
    Append,
}

impl RedirectionMode {
    fn flags(self) -> OFlag {
        match self {
            RedirectionMode::Override => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            RedirectionMode::Append => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
        }
    }
}

/// Split `cmd > path` / `cmd >> path`.
///
/// The command is the text before the first `>`, the path the text after
/// the last one. Returns `None` when there is no `>` at all.
pub fn split(text: &str) -> Option<(RedirectionMode, &str, &str)> {
    let first = text.find('>')?;
    let last = text.rfind('>')?;
    let mode = if text[first + 1..].starts_with('>') {
        RedirectionMode::Append
    } else {
        RedirectionMode::Override
    };
    Some((mode, parser::trim(&text[..first]), parser::trim(&text[last + 1..])))
}

/// Runs one sub-command with standard output sent to a file.
pub struct RedirectionCommand {
    line: CommandLine,
    mode: RedirectionMode,
    path: PathBuf,
    command: Box<dyn ExecutableCommand>,
}

impl CommandFactory for Factory<RedirectionCommand> {
    fn try_create(
        &self,
        env: &Environment,
        dispatcher: &Dispatcher,
        line: &str,
    ) -> Option<Box<dyn ExecutableCommand>> {
        let text = parser::normalize(line);
        let (mode, command, path) = split(&text)?;
        let line = CommandLine::new(line);
        let command = if command.is_empty() || path.is_empty() {
            None
        } else {
            dispatcher.create(env, command)
        };
        let Some(command) = command else {
            let error = usage_error("redirection", "invalid arguments");
            return Some(Box::new(InvalidArgs::new(line, error)));
        };
        Some(Box::new(RedirectionCommand {
            line,
            mode,
            path: PathBuf::from(path),
            command,
        }))
    }
}

impl ExecutableCommand for RedirectionCommand {
    fn command_line(&self) -> &CommandLine {
        &self.line
    }

    fn execute(self: Box<Self>, env: &mut Environment) -> Result<()> {
        let redirected = SavedStdout::redirect_to(&self.path, self.mode)?;
        log::debug!("stdout -> {} ({:?})", self.path.display(), self.mode);
        let result = self.command.execute(env);
        drop(redirected);
        result
    }
}

/// The shell's original standard output, put back on drop.
struct SavedStdout {
    fd: RawFd,
}

impl SavedStdout {
    fn redirect_to(path: &Path, mode: RedirectionMode) -> Result<Self> {
        let _ = std::io::stdout().flush();
        let fd = fcntl(STDOUT_FILENO, FcntlArg::F_DUPFD_CLOEXEC(3)).context("smash error: dup failed")?;
        let saved = SavedStdout { fd };

        close(STDOUT_FILENO).context("smash error: close failed")?;
        let opened = open(path, mode.flags(), Mode::from_bits_truncate(0o666))
            .context("smash error: open failed")?;
        if opened != STDOUT_FILENO {
            move_onto(opened, STDOUT_FILENO).context("smash error: dup2 failed")?;
        }
        Ok(saved)
    }
}

/// Duplicate `fd` onto `target` and close `fd`, whether or not the
/// duplication worked.
fn move_onto(fd: RawFd, target: RawFd) -> nix::Result<()> {
    let moved = dup2(fd, target);
    let _ = close(fd);
    moved.map(|_| ())
}

impl Drop for SavedStdout {
    fn drop(&mut self) {
        let _ = std::io::stdout().flush();
        if let Err(errno) = dup2(self.fd, STDOUT_FILENO) {
            log::warn!("could not restore stdout: {errno}");
            eprintln!("smash error: dup2 failed: {errno}");
        }
        let _ = close(self.fd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_arrow_overrides() {
        assert_eq!(
            split("ls -l > out.txt"),
            Some((RedirectionMode::Override, "ls -l", "out.txt"))
        );
    }

    #[test]
    fn test_double_arrow_appends() {
        assert_eq!(
            split("echo hi>>log"),
            Some((RedirectionMode::Append, "echo hi", "log"))
        );
    }

    #[test]
    fn test_command_before_first_and_path_after_last() {
        assert_eq!(
            split("a > b > c"),
            Some((RedirectionMode::Override, "a", "c"))
        );
    }

    #[test]
    fn test_no_arrow_is_not_a_redirection() {
        assert_eq!(split("echo hi"), None);
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let env = Environment::new();
        let dispatcher = Dispatcher::default();
        let cmd = Factory::<RedirectionCommand>::default()
            .try_create(&env, &dispatcher, "echo hi >")
            .unwrap();
        let err = cmd.execute(&mut Environment::new()).unwrap_err();
        assert_eq!(err.to_string(), "smash error: redirection: invalid arguments");
    }

    #[test]
    fn test_original_line_is_kept() {
        let env = Environment::new();
        let dispatcher = Dispatcher::default();
        let cmd = Factory::<RedirectionCommand>::default()
            .try_create(&env, &dispatcher, "echo hi > out &")
            .unwrap();
        assert_eq!(cmd.command_line().text(), "echo hi > out &");
    }

    #[test]
    fn test_move_onto_closes_source_even_on_failure() {
        let low = open(
            Path::new("/dev/null"),
            OFlag::O_WRONLY | OFlag::O_CLOEXEC,
            Mode::empty(),
        )
        .unwrap();
        // A high number that other tests opening files will not reuse.
        let fd = fcntl(low, FcntlArg::F_DUPFD_CLOEXEC(900)).unwrap();
        close(low).unwrap();

        assert!(move_onto(fd, -1).is_err());
        assert_eq!(fcntl(fd, FcntlArg::F_GETFD), Err(nix::errno::Errno::EBADF));
    }
}
