use crate::env::Environment;
use crate::interpreter::Dispatcher;
use crate::parser;
use anyhow::Result;

/// Whether a command runs while the shell waits for it or alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundType {
    Foreground,
    Background,
}

/// The text a command was built from, exactly as typed.
///
/// The ground type is derived once, from the trailing background marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    text: String,
    ground: GroundType,
}

impl CommandLine {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let ground = if parser::is_background(&text) {
            GroundType::Background
        } else {
            GroundType::Foreground
        };
        Self { text, ground }
    }

    /// The untrimmed original text, background marker included.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn ground(&self) -> GroundType {
        self.ground
    }

    pub fn is_background(&self) -> bool {
        self.ground == GroundType::Background
    }

    /// Trimmed text with the background marker removed.
    pub fn normalized(&self) -> String {
        parser::normalize(&self.text)
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// A command is built for exactly one execution: `execute` consumes it.
pub trait ExecutableCommand {
    /// The line this command was recognized from.
    fn command_line(&self) -> &CommandLine;

    /// Executes the command against the shell context.
    fn execute(self: Box<Self>, env: &mut Environment) -> Result<()>;

    /// Runs the command as the whole body of a forked child and returns the
    /// child's exit status.
    ///
    /// Commands that start a program replace the child with it instead of
    /// forking once more, so the pid the parent waits on is the program's.
    fn run_as_child(self: Box<Self>, env: &mut Environment) -> i32 {
        match self.execute(env) {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("{err:#}");
                1
            }
        }
    }
}

/// Recognizer for one command variant.
///
/// Returns `None` when the line is not this variant's syntax, letting the
/// dispatcher fall through to the next factory. Composite variants use the
/// `dispatcher` to build the sub-commands they own.
pub trait CommandFactory {
    fn try_create(
        &self,
        env: &Environment,
        dispatcher: &Dispatcher,
        line: &str,
    ) -> Option<Box<dyn ExecutableCommand>>;
}
