use crate::config::Args;
use anyhow::{Context, Result};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::OpenOptions;

/// Install the loggers `args` asks for.
///
/// `--log-file` appends every record to the file, `--verbose` echoes debug
/// records on standard error. With neither, no logger is installed.
pub fn init(args: &Args) -> Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if args.verbose {
        loggers.push(TermLogger::new(
            LevelFilter::Debug,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if let Some(path) = &args.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("smash error: cannot open log file {}", path.display()))?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }
    if loggers.is_empty() {
        return Ok(());
    }
    CombinedLogger::init(loggers).context("smash error: logger already installed")?;
    log::info!("smash {} started", std::process::id());
    Ok(())
}
