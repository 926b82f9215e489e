use crate::command::{CommandFactory, ExecutableCommand};
use crate::env::{Environment, Settings};
use crate::parser;
use crate::signals;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: built-ins, composites and
/// ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// An ordered list of recognizers. The first factory that accepts a line
/// builds its command.
pub struct Dispatcher {
    factories: Vec<Box<dyn CommandFactory>>,
}

impl Dispatcher {
    pub fn new(factories: Vec<Box<dyn CommandFactory>>) -> Self {
        Self { factories }
    }

    /// Build the command for `line`, or `None` for a blank line or a line
    /// no factory accepts.
    pub fn create(&self, env: &Environment, line: &str) -> Option<Box<dyn ExecutableCommand>> {
        if parser::trim(line).is_empty() {
            return None;
        }
        let command = self
            .factories
            .iter()
            .find_map(|factory| factory.try_create(env, self, line));
        if command.is_none() {
            log::debug!("no command for {line:?}");
        }
        command
    }
}

impl Default for Dispatcher {
    /// Composites first, then the built-ins, with external commands as the
    /// catch-all.
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        use crate::pipe::PipeCommand;
        use crate::redirect::RedirectionCommand;
        Self::new(vec![
            Box::new(Factory::<RedirectionCommand>::default()),
            Box::new(Factory::<PipeCommand>::default()),
            Box::new(Factory::<ChangePrompt>::default()),
            Box::new(Factory::<ShowPid>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Jobs>::default()),
            Box::new(Factory::<Foreground>::default()),
            Box::new(Factory::<Quit>::default()),
            Box::new(Factory::<Kill>::default()),
            Box::new(Factory::<Chmod>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}

/// The shell: an [`Environment`] plus the [`Dispatcher`] that turns lines
/// into commands.
///
/// Example
/// ```no_run
/// use smash::Interpreter;
/// let mut sh = Interpreter::default();
/// sh.execute_line("echo hello world").unwrap();
/// ```
pub struct Interpreter {
    env: Environment,
    dispatcher: Dispatcher,
}

impl Interpreter {
    /// Create a new interpreter with a custom dispatcher.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            env: Environment::new(),
            dispatcher,
        }
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            env: Environment::with_settings(settings),
            dispatcher: Dispatcher::default(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Run one command line to completion.
    ///
    /// Finished background jobs are pruned first. A blank line does nothing.
    pub fn execute_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.env.jobs.remove_finished_jobs();
        let Some(command) = self.dispatcher.create(&self.env, line) else {
            return Ok(());
        };
        log::debug!("executing {:?}", command.command_line().text());
        let result = command.execute(&mut self.env);
        self.env.foreground.clear();
        result
    }

    /// Read-eval-print loop on the terminal.
    ///
    /// Ends on end-of-file or once a command sets `should_exit`.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        signals::install(self.env.foreground.clone())?;
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            let _ = self.env.foreground.report_interrupt(&mut std::io::stdout());
            match rl.readline(&format!("{}> ", self.env.prompt)) {
                Ok(line) => {
                    if !parser::trim(&line).is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    if let Err(err) = self.execute_line(&line) {
                        eprintln!("{err:#}");
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("smash: got ctrl-C");
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }
        log::info!("leaving the interactive loop");
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}
