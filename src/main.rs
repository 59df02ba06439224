use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod controller;
mod error;
mod gui;
mod package;
mod pacman;
mod probe;
mod runner;
mod utils;

use cli::Cli;
use config::Config;

fn main() -> Result<()> {
    env_logger::init();
    log::debug!("Arguments: {:?}", std::env::args().collect::<Vec<String>>());

    // No arguments: graphical installer. Anything else goes to the CLI.
    if std::env::args().len() == 1 {
        let config = Config::load().unwrap_or_else(|e| {
            log::warn!("Ignoring unusable config: {}", e);
            Config::default()
        });
        gui::run(config)?;
        return Ok(());
    }

    let cli = Cli::parse();
    if let Err(e) = cli.run() {
        log::debug!("CLI command failed: {:?}", e);
        utils::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
