mod cli;
mod commands;
mod config;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Settings;
use deploygraph::Pass;
use morpheus_api::Client;
use std::io;
use std::process;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    settings: Settings,
    host: Option<String>,
    token: Option<String>,
    insecure: bool,
}

impl Context {
    /// Build an API client from flags, environment and the settings file.
    pub fn client(&self) -> Result<Client> {
        let config = self
            .settings
            .client_config(self.host.clone(), self.token.clone(), self.insecure)?;
        if !config.verify_ssl {
            log::warn!("TLS certificate verification disabled for {}", config.host);
        }
        log::debug!("using {}", config.base_url());
        Ok(Client::new(&config))
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
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

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(err) = run(cli) {
        ui::fatal(&format!("{err:#}"));
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "morpheus-deploy", &mut io::stdout());
        return Ok(());
    }

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings: Settings::load(cli.config.as_deref())?,
        host: cli.host,
        token: cli.token,
        insecure: cli.insecure,
    };
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Deploy(args) => commands::deploy::run(&ctx, &args.paths, Pass::Deploy),
        Command::Undeploy(args) => commands::deploy::run(&ctx, &args.paths, Pass::Undeploy),
        Command::Plan(args) => commands::deploy::plan(&ctx, &args.paths, args.undeploy),
        Command::Get(args) => commands::api::get(&ctx, &args),
        Command::Export(args) => commands::api::export(&ctx, &args),
        Command::Completions { .. } => Ok(()),
    }
}
