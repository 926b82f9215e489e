use crate::env::{DEFAULT_INTERPRETER, DEFAULT_PROMPT, Settings};
use argh::FromArgs;
use std::path::PathBuf;

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_interpreter() -> PathBuf {
    PathBuf::from(DEFAULT_INTERPRETER)
}

/// smash: a small job-control shell.
#[derive(FromArgs, Debug)]
pub struct Args {
    /// run a single command line and exit
    #[argh(option, short = 'c')]
    pub command: Option<String>,

    /// initial prompt, also restored by a bare `chprompt`
    #[argh(option, default = "default_prompt()")]
    pub prompt: String,

    /// program that runs lines containing wildcards
    #[argh(option, default = "default_interpreter()")]
    pub interpreter: PathBuf,

    /// write log records to this file
    #[argh(option)]
    pub log_file: Option<PathBuf>,

    /// log debug records to standard error
    #[argh(switch, short = 'v')]
    pub verbose: bool,
}

impl Args {
    pub fn settings(&self) -> Settings {
        Settings {
            prompt: self.prompt.clone(),
            interpreter: self.interpreter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["smash"], args).expect("valid arguments")
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.command, None);
        assert!(!args.verbose);
        assert!(args.log_file.is_none());

        let settings = args.settings();
        assert_eq!(settings.prompt, "smash");
        assert_eq!(settings.interpreter, PathBuf::from("/bin/bash"));
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&[
            "-c",
            "echo hi",
            "--prompt",
            "dev",
            "--interpreter",
            "/bin/sh",
            "--log-file",
            "/tmp/smash.log",
            "-v",
        ]);
        assert_eq!(args.command.as_deref(), Some("echo hi"));
        assert!(args.verbose);
        assert_eq!(args.log_file, Some(PathBuf::from("/tmp/smash.log")));

        let settings = args.settings();
        assert_eq!(settings.prompt, "dev");
        assert_eq!(settings.interpreter, PathBuf::from("/bin/sh"));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Args::from_args(&["smash"], &["--bogus"]).is_err());
    }
}
