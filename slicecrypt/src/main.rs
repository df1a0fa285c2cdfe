use clap::{ColorChoice, Parser};
use colored::Colorize;
use slicecrypt::{Args, Commands, Logger, UsageError};
use std::{
    io::{IsTerminal, stderr},
    process,
};

fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    colored::control::set_override(match args.color {
        ColorChoice::Always => true,
        ColorChoice::Auto => stderr().is_terminal(),
        ColorChoice::Never => false,
    });

    Logger::init(args.log_level)?;

    match args.command {
        Commands::Decrypt(args) => args.execute()?,
        Commands::Encrypt(args) => args.execute()?,
        Commands::Inspect(args) => args.execute()?,
        Commands::Keygen(args) => args.execute()?,
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {:#}", "error".bold().red(), e);

        if e.downcast_ref::<UsageError>().is_some() {
            process::exit(2);
        }

        process::exit(1);
    }
}
