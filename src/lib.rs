//! The command execution and job-control engine of `smash`, a small Unix shell.
//!
//! A line typed at the prompt goes through a [`Dispatcher`]: an ordered list of
//! recognizers that turns it into an executable command. Composite commands
//! (output redirection, pipes) come first, then the built-ins, and anything
//! else is an external program run in a child process. Lines ending in `&`
//! run in the background and are tracked in the job table of the
//! [`Environment`].
//!
//! [`Interpreter`] ties the environment and the dispatcher together and
//! provides the interactive loop.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod external;
mod interpreter;
pub mod jobs;
pub mod logging;
pub mod parser;
pub mod pipe;
pub mod process;
pub mod redirect;
pub mod signals;

pub use command::{CommandLine, ExecutableCommand, GroundType};
pub use env::{Environment, Settings};
pub use interpreter::{Dispatcher, Interpreter};
