mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, ColorMode, Command, OutputFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let matches = Cli::command().get_matches();
    let mut cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    apply_file_defaults(&mut cli, &matches);

    init_tracing(cli.global.verbose, cli.global.quiet);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, quiet: bool) {
    let filter = match (quiet, verbosity) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `[defaults]` from the config file fill in for flags left at their
/// built-in default.
fn apply_file_defaults(cli: &mut Cli, matches: &ArgMatches) {
    let is_default = |id: &str| matches.value_source(id) == Some(ValueSource::DefaultValue);
    if !is_default("output") && !is_default("color") {
        return;
    }

    let defaults = zerofly_config::load_config_or_default().defaults;
    if is_default("output") {
        if let Ok(format) = OutputFormat::from_str(&defaults.output, true) {
            cli.global.output = format;
        }
    }
    if is_default("color") {
        if let Ok(mode) = ColorMode::from_str(&defaults.color, true) {
            cli.global.color = mode;
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never start a controller
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global).await,

        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "zerofly", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &cli.global).await
        }
    }
}
