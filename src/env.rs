use crate::jobs::JobsList;
use crate::signals::ForegroundRegister;
use std::path::PathBuf;
use std::sync::Arc;

/// Prompt used until `chprompt` changes it.
pub const DEFAULT_PROMPT: &str = "smash";

/// Program that receives lines containing wildcards.
pub const DEFAULT_INTERPRETER: &str = "/bin/bash";

/// Start-up values for an [`Environment`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub prompt: String,
    pub interpreter: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
        }
    }
}

/// Mutable shell state handed to every command's `execute`.
///
/// The environment contains:
/// - `prompt`: the text shown before `> ` at each prompt.
/// - `foreground`: the register the interrupt handler reads.
/// - `jobs`: the background job table.
/// - `dir_history`: directories left by `cd`, most recent last.
/// - `should_exit`: a flag that the interactive loop checks to know when to terminate.
#[derive(Debug, Clone)]
pub struct Environment {
    pub prompt: String,
    pub default_prompt: String,
    pub interpreter: PathBuf,
    pub foreground: Arc<ForegroundRegister>,
    pub jobs: JobsList,
    pub dir_history: Vec<PathBuf>,
    pub should_exit: bool,
}

impl Environment {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            prompt: settings.prompt.clone(),
            default_prompt: settings.prompt,
            interpreter: settings.interpreter,
            foreground: Arc::new(ForegroundRegister::new()),
            jobs: JobsList::new(),
            dir_history: Vec::new(),
            should_exit: false,
        }
    }

    /// Restore the prompt the shell started with.
    pub fn reset_prompt(&mut self) {
        self.prompt = self.default_prompt.clone();
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
