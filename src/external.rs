use crate::command::{CommandFactory, CommandLine, ExecutableCommand};
use crate::env::Environment;
use crate::interpreter::{Dispatcher, Factory};
use crate::parser;
use crate::process;
use anyhow::{Context, Result};
use nix::unistd::execvp;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

/// Characters that make a line too complex to split into an argv.
const WILDCARDS: &[char] = &['*', '?'];

/// How an external line is turned into a program invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    /// Tokenized and executed directly.
    Simple,
    /// Handed whole to the configured interpreter.
    Complex,
}

impl Complexity {
    pub fn of(line: &str) -> Self {
        if line.contains(WILDCARDS) {
            Complexity::Complex
        } else {
            Complexity::Simple
        }
    }
}

/// Command that is not a builtin.
pub struct ExternalCommand {
    line: CommandLine,
    complexity: Complexity,
}

impl ExternalCommand {
    pub fn new(line: CommandLine) -> Self {
        let complexity = Complexity::of(line.text());
        Self { line, complexity }
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    /// The argument vector handed to `execvp`, built before forking.
    fn argv(&self, env: &Environment) -> Result<Vec<CString>> {
        let text = self.line.normalized();
        let argv = match self.complexity {
            Complexity::Complex => vec![
                CString::new(env.interpreter.as_os_str().as_bytes())?,
                CString::new("-c")?,
                CString::new(text)?,
            ],
            Complexity::Simple => parser::tokenize(&text)
                .into_iter()
                .map(CString::new)
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(argv)
    }
}

/// Catch-all: every line that reaches this factory is external.
impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        _env: &Environment,
        _dispatcher: &Dispatcher,
        line: &str,
    ) -> Option<Box<dyn ExecutableCommand>> {
        Some(Box::new(ExternalCommand::new(CommandLine::new(line))))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn command_line(&self) -> &CommandLine {
        &self.line
    }

    fn execute(self: Box<Self>, env: &mut Environment) -> Result<()> {
        let argv = self
            .argv(env)
            .context("smash error: invalid command line")?;
        if argv.is_empty() {
            return Ok(());
        }

        let pid = process::spawn(|| exec(&argv))?;
        log::debug!("{:?} command {pid}: {}", self.complexity, self.line);

        if self.line.is_background() {
            env.jobs.add_job(self.line, pid);
            Ok(())
        } else {
            process::wait_foreground(env, pid)
        }
    }

    fn run_as_child(self: Box<Self>, env: &mut Environment) -> i32 {
        match self.argv(env) {
            Ok(argv) => exec(&argv),
            Err(err) => {
                eprintln!("smash error: invalid command line: {err}");
                1
            }
        }
    }
}

/// Replace the current process with `argv`. Returns only on failure, with
/// the exit status the child should report.
fn exec(argv: &[CString]) -> i32 {
    let Some(program) = argv.first() else {
        return 0;
    };
    let err = match execvp(program, argv) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    eprintln!("smash error: execvp failed: {err}");
    1
}
