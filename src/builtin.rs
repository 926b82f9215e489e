use crate::command::{CommandFactory, CommandLine, ExecutableCommand};
use crate::env::Environment;
use crate::interpreter::{Dispatcher, Factory};
use crate::parser;
use crate::process;
use anyhow::{Context, Result, anyhow};
use nix::sys::signal::{self, Signal};
use regex::Regex;
use std::env;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are recognized by an exact match of their name against the
/// first token of the line and run in-process, always in the foreground.
/// Argument validation happens in [`BuiltinCommand::parse`], before anything
/// is executed.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "jobs" or "cd".
    fn name() -> &'static str;

    /// Validate the arguments that follow the name.
    fn parse(args: &[&str], env: &Environment) -> Result<Self>;

    /// Executes the command, writing regular output to `stdout`.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<()>;
}

/// User input error in `smash error: <command>: <reason>` form.
pub(crate) fn usage_error(command: &str, reason: impl std::fmt::Display) -> anyhow::Error {
    anyhow!("smash error: {command}: {reason}")
}

fn invalid_arguments(command: &str) -> anyhow::Error {
    usage_error(command, "invalid arguments")
}

struct Builtin<T> {
    line: CommandLine,
    command: T,
}

impl<T: BuiltinCommand> ExecutableCommand for Builtin<T> {
    fn command_line(&self) -> &CommandLine {
        &self.line
    }

    fn execute(self: Box<Self>, env: &mut Environment) -> Result<()> {
        let mut stdout = std::io::stdout();
        let result = self.command.execute(&mut stdout, env);
        stdout.flush()?;
        result
    }
}

/// A line that was recognized but rejected; executing it reports why.
pub(crate) struct InvalidArgs {
    line: CommandLine,
    error: anyhow::Error,
}

impl InvalidArgs {
    pub(crate) fn new(line: CommandLine, error: anyhow::Error) -> Self {
        Self { line, error }
    }
}

impl ExecutableCommand for InvalidArgs {
    fn command_line(&self) -> &CommandLine {
        &self.line
    }

    fn execute(self: Box<Self>, _env: &mut Environment) -> Result<()> {
        Err(self.error)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        env: &Environment,
        _dispatcher: &Dispatcher,
        line: &str,
    ) -> Option<Box<dyn ExecutableCommand>> {
        let text = parser::normalize(line);
        let tokens = parser::tokenize(&text);
        let (&name, args) = tokens.split_first()?;
        if name != T::name() {
            return None;
        }
        let line = CommandLine::new(line);
        Some(match T::parse(args, env) {
            Ok(command) => Box::new(Builtin { line, command }),
            Err(error) => Box::new(InvalidArgs::new(line, error)),
        })
    }
}

/// Change the prompt; without an argument, restore the default one.
pub struct ChangePrompt {
    pub prompt: Option<String>,
}

impl BuiltinCommand for ChangePrompt {
    fn name() -> &'static str {
        "chprompt"
    }

    fn parse(args: &[&str], _env: &Environment) -> Result<Self> {
        Ok(Self {
            prompt: args.first().map(|p| p.to_string()),
        })
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        match self.prompt {
            Some(prompt) => env.prompt = prompt,
            None => env.reset_prompt(),
        }
        Ok(())
    }
}

/// Print the shell's own process id.
pub struct ShowPid {}

impl BuiltinCommand for ShowPid {
    fn name() -> &'static str {
        "showpid"
    }

    fn parse(_args: &[&str], _env: &Environment) -> Result<Self> {
        Ok(Self {})
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<()> {
        writeln!(stdout, "smash pid is {}", std::process::id())?;
        Ok(())
    }
}

/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn parse(_args: &[&str], _env: &Environment) -> Result<Self> {
        Ok(Self {})
    }

    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<()> {
        let cwd = env::current_dir().context("smash error: getcwd failed")?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(())
    }
}

/// Where `cd` should go.
#[derive(Debug, PartialEq, Eq)]
pub enum CdTarget {
    /// `-`: the directory on top of the history stack.
    Previous,
    /// `..`
    Parent,
    /// No argument: `$HOME`.
    Home,
    Path(PathBuf),
}

/// Change the current working directory.
pub struct Cd {
    pub target: CdTarget,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn parse(args: &[&str], env: &Environment) -> Result<Self> {
        let target = match args {
            [] => CdTarget::Home,
            ["-"] if env.dir_history.is_empty() => {
                return Err(usage_error("cd", "OLDPWD not set"));
            }
            ["-"] => CdTarget::Previous,
            [".."] => CdTarget::Parent,
            [path] => CdTarget::Path(PathBuf::from(path)),
            _ => return Err(usage_error("cd", "too many arguments")),
        };
        Ok(Self { target })
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        let current = env::current_dir().context("smash error: getcwd failed")?;
        let destination = match &self.target {
            CdTarget::Previous => env
                .dir_history
                .last()
                .cloned()
                .ok_or_else(|| usage_error("cd", "OLDPWD not set"))?,
            CdTarget::Parent => current.parent().unwrap_or(&current).to_path_buf(),
            CdTarget::Home => env::var_os("HOME")
                .map(PathBuf::from)
                .ok_or_else(|| usage_error("cd", "HOME not set"))?,
            CdTarget::Path(path) => path.clone(),
        };

        env::set_current_dir(&destination).context("smash error: chdir failed")?;
        if self.target == CdTarget::Previous {
            env.dir_history.pop();
        }
        log::debug!("cd {} -> {}", current.display(), destination.display());
        env.dir_history.push(current);
        Ok(())
    }
}

/// List the background jobs.
pub struct Jobs {}

impl BuiltinCommand for Jobs {
    fn name() -> &'static str {
        "jobs"
    }

    fn parse(_args: &[&str], _env: &Environment) -> Result<Self> {
        Ok(Self {})
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        env.jobs.remove_finished_jobs();
        env.jobs.print_jobs_list(stdout)?;
        Ok(())
    }
}

/// Bring a background job to the foreground and wait for it.
pub struct Foreground {
    pub job_id: usize,
}

impl BuiltinCommand for Foreground {
    fn name() -> &'static str {
        "fg"
    }

    fn parse(args: &[&str], env: &Environment) -> Result<Self> {
        let job_id = match args.first() {
            None => match env.jobs.get_last_job() {
                Some(job) => job.id(),
                None => return Err(usage_error("fg", "jobs list is empty")),
            },
            Some(arg) => arg.parse::<usize>().map_err(|_| invalid_arguments("fg"))?,
        };
        if !args.is_empty() && env.jobs.get_job_by_id(job_id).is_none() {
            return Err(usage_error("fg", format!("job-id {job_id} does not exist")));
        }
        if args.len() > 1 {
            return Err(invalid_arguments("fg"));
        }
        Ok(Self { job_id })
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        let Some(job) = env.jobs.remove_job_by_id(self.job_id) else {
            return Ok(());
        };
        writeln!(stdout, "{} {}", job.command_line(), job.pid())?;
        stdout.flush()?;
        process::wait_foreground(env, job.pid())
    }
}

/// Leave the shell, optionally killing every background job first.
pub struct Quit {
    pub kill: bool,
}

impl BuiltinCommand for Quit {
    fn name() -> &'static str {
        "quit"
    }

    fn parse(args: &[&str], _env: &Environment) -> Result<Self> {
        Ok(Self {
            kill: args.first() == Some(&"kill"),
        })
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        if self.kill {
            writeln!(stdout, "smash: sending SIGKILL signal to {} jobs:", env.jobs.len())?;
            env.jobs.kill_all_jobs(stdout)?;
        }
        env.should_exit = true;
        Ok(())
    }
}

/// Send a signal to a background job: `kill -<signum> <job-id>`.
pub struct Kill {
    pub signal: Signal,
    pub job_id: usize,
}

impl BuiltinCommand for Kill {
    fn name() -> &'static str {
        "kill"
    }

    fn parse(args: &[&str], env: &Environment) -> Result<Self> {
        let job_id = args
            .get(1)
            .and_then(|arg| arg.parse::<usize>().ok())
            .ok_or_else(|| invalid_arguments("kill"))?;
        if env.jobs.get_job_by_id(job_id).is_none() {
            return Err(usage_error("kill", format!("job-id {job_id} does not exist")));
        }
        if args.len() != 2 {
            return Err(invalid_arguments("kill"));
        }

        let pattern = Regex::new(r"^-(\d+)$").context("smash error: kill: bad pattern")?;
        let signal = pattern
            .captures(args[0])
            .and_then(|caps| caps[1].parse::<i32>().ok())
            .and_then(|number| Signal::try_from(number).ok())
            .ok_or_else(|| invalid_arguments("kill"))?;
        Ok(Self { signal, job_id })
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<()> {
        let Some(job) = env.jobs.get_job_by_id(self.job_id) else {
            return Ok(());
        };
        signal::kill(job.pid(), self.signal).context("smash error: kill failed")?;
        writeln!(
            stdout,
            "signal number {} was sent to pid {}",
            self.signal as i32,
            job.pid()
        )?;
        Ok(())
    }
}

/// Change permission bits: `chmod <ooo> <path>`.
pub struct Chmod {
    pub mode: u32,
    pub path: PathBuf,
}

impl BuiltinCommand for Chmod {
    fn name() -> &'static str {
        "chmod"
    }

    fn parse(args: &[&str], _env: &Environment) -> Result<Self> {
        let [mode, path] = args else {
            return Err(invalid_arguments("chmod"));
        };
        let pattern = Regex::new("^[0-7]{3}$").context("smash error: chmod: bad pattern")?;
        if !pattern.is_match(mode) {
            return Err(invalid_arguments("chmod"));
        }
        let mode = u32::from_str_radix(mode, 8).map_err(|_| invalid_arguments("chmod"))?;
        Ok(Self {
            mode,
            path: Path::new(path).to_path_buf(),
        })
    }

    fn execute(self, _stdout: &mut dyn Write, _env: &mut Environment) -> Result<()> {
        fs::set_permissions(&self.path, fs::Permissions::from_mode(self.mode))
            .context("smash error: chmod failed")?;
        Ok(())
    }
}
