use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use focuslog::{
    commands::{Arguments, Commands},
    config::load_config,
};

mod commands;
mod timer;

fn main() {
    dotenv().ok();
    let args = Arguments::parse();

    if let Err(err) = stderrlog::new()
        .quiet(args.quiet)
        .verbosity(args.verbose as usize + 2)
        .init()
    {
        eprintln!("Could not set up logging: {err}");
    }

    if let Err(err) = run(args) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Arguments) -> Result<()> {
    let config = load_config(args.config)?;

    match args.command {
        Commands::Signin(signin) => commands::signin(config, signin)?,
        Commands::Signout => commands::signout(config)?,
        Commands::Whoami => commands::whoami(config)?,
        Commands::Task(task) => commands::task(config, task)?,
        Commands::Timer => timer::run(config)?,
        Commands::History(history) => commands::history(config, history)?,
        Commands::Heatmap(heatmap) => commands::heatmap(config, heatmap)?,
    }
    Ok(())
}
