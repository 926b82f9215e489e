use smash::Interpreter;
use smash::config::Args;

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    smash::logging::init(&args)?;

    let mut sh = Interpreter::with_settings(args.settings());
    match &args.command {
        Some(line) => {
            if let Err(err) = sh.execute_line(line) {
                eprintln!("{err:#}");
                std::process::exit(1);
            }
        }
        None => sh.repl()?,
    }
    Ok(())
}
