//! basel - component stability / abstraction metrics

mod config;
mod exporters;
mod report_cli;
mod views;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "basel")]
#[command(about = "Component instability, abstraction and main-sequence distance", version)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Abstract-stability metrics table
    Report(report_cli::AnalyzeArgs),
    /// Component relationship matrix
    Rel(report_cli::AnalyzeArgs),
}

/// `Ok(None)` when only help was shown (no arguments)
fn parse_args<I, T>(args: I) -> Result<Option<Cli>, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(e) if e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            e.print()?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match parse_args(std::env::args_os()) {
        Ok(Some(cli)) => cli,
        Ok(None) => return Ok(()),
        Err(e) => e.exit(),
    };
    let config = config::Config::from_env();

    match cli.command {
        Commands::Report(args) => report_cli::run_report(args, config).await?,
        Commands::Rel(args) => report_cli::run_rel(args, config).await?,
    }

    Ok(())
}
