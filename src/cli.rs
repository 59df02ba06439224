use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::*;

use crate::config::Config;
use crate::controller::{Controller, Effect, NoticeKind};
use crate::probe::HostProbe;
use crate::runner::{self, RunEvent};
use crate::utils::{self, confirm};

#[derive(Parser)]
#[clap(name = "pacinstaller")]
#[clap(about = "Install and remove pacman packages", long_about = "Install and remove pacman packages.\n\nRun without arguments to open the graphical installer.\nLocal archives are recognised by their .pkg.tar.zst suffix.")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List packages available in the sync databases
    List {
        /// Only show packages whose name contains this text
        #[clap(short, long)]
        filter: Option<String>,
    },
    /// Show information about an installed package
    Show {
        /// Package name
        package: String,
    },
    /// Install a package by name or from a local .pkg.tar.zst archive
    Install {
        /// Package name or archive path
        target: String,
        /// Don't ask for confirmation
        #[clap(short, long)]
        yes: bool,
    },
    /// Remove a package
    Remove {
        /// Package name
        package: String,
        /// Don't ask for confirmation
        #[clap(short, long)]
        yes: bool,
    },
    /// Delete a stale pacman database lock
    Unlock {
        /// Don't ask for confirmation
        #[clap(short, long)]
        yes: bool,
    },
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[clap(long)]
        init: bool,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config = Config::load()?;
        let mut controller = Controller::new(config);

        match self.command {
            Commands::List { filter } => {
                list(&mut controller, filter.unwrap_or_default())?;
            }
            Commands::Show { package } => {
                show(&mut controller, package)?;
            }
            Commands::Install { target, yes } => {
                controller.set_input(target);
                controller.request_install()?;
                run_pending(&mut controller, yes)?;
            }
            Commands::Remove { package, yes } => {
                controller.set_input(package);
                controller.request_remove()?;
                run_pending(&mut controller, yes)?;
            }
            Commands::Unlock { yes } => {
                controller.request_unlock()?;
                run_pending(&mut controller, yes)?;
            }
            Commands::Config { init } => {
                println!("{}", serde_json::to_string_pretty(controller.config())?);
                if init {
                    let path = controller.config().save()?;
                    utils::print_success(&format!("Wrote {}", path.display()));
                }
            }
        }
        Ok(())
    }
}

fn list(controller: &mut Controller, filter: String) -> Result<()> {
    let Effect::Capture(_, command) = controller.request_packages() else {
        bail!("Package listing did not produce a query");
    };
    let result = runner::capture_blocking(&command).map_err(|e| e.to_string());
    controller.on_packages_loaded(result);
    fail_on_error_notice(controller)?;

    controller.set_filter(filter);
    for pkg in controller.visible_packages() {
        let marker = if pkg.installed {
            " [installed]".green().to_string()
        } else {
            String::new()
        };
        println!("{} {}{}", pkg.qualified_name().bold(), pkg.version, marker);
        if !pkg.description.is_empty() {
            println!("    {}", pkg.description);
        }
    }
    Ok(())
}

fn show(controller: &mut Controller, package: String) -> Result<()> {
    let Effect::Capture(_, command) = controller.select_package(package.clone()) else {
        bail!("Package query did not produce a query");
    };
    let result = runner::capture_blocking(&command).map_err(|e| e.to_string());
    let succeeded = matches!(&result, Ok(captured) if captured.success());
    controller.on_details_loaded(&package, result);

    if !succeeded {
        bail!("{}", controller.details());
    }
    print!("{}", controller.details());
    Ok(())
}

fn run_pending(controller: &mut Controller, yes: bool) -> Result<()> {
    let prompt = controller.pending_prompt().unwrap_or_default();
    if !yes && !controller.config().auto_confirm && !confirm(&prompt)? {
        controller.decline();
        utils::print_info("Cancelled");
        return Ok(());
    }

    let probe = HostProbe::new(&controller.config().pacman_binary);
    let Effect::Stream(command) = controller.confirm(&probe)? else {
        bail!("Confirmed operation did not produce a command");
    };

    utils::print_info(&format!("Running: {}", command));
    let mut events = runner::spawn(&command);
    while let Some(event) = events.blocking_recv() {
        match &event {
            RunEvent::Line(line) => println!("{}", line),
            RunEvent::Exited(status) if *status != 0 => {
                utils::print_warning(&format!("Exit status: {}", status));
            }
            _ => {}
        }
        // The package list only matters to the GUI.
        let _reload = controller.on_run_event(event);
    }

    fail_on_error_notice(controller)?;
    match controller.notice() {
        Some(notice) => utils::print_success(&notice.body),
        None => bail!("Command ended without reporting a status"),
    }
    Ok(())
}

fn fail_on_error_notice(controller: &Controller) -> Result<()> {
    if let Some(notice) = controller.notice() {
        if notice.kind == NoticeKind::Error {
            bail!("{}", notice.body);
        }
    }
    Ok(())
}
