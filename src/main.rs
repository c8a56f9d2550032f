mod build;
mod cli;
mod commands;
mod config;
mod provider;
mod runner;
mod schema;
mod serve;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity; stderr only, stdout carries protocol traffic
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    match cli.command {
        None | Some(Command::Serve) => commands::serve::run(&ctx, cli.serve),
        Some(Command::Digest(args)) => commands::digest::run(&ctx, &args),
        Some(Command::Schema { package_version }) => commands::schema::run(&package_version),
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(
                shell,
                &mut cmd,
                "pulumi-resource-docker-buildkit",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
