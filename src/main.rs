use anyhow::Result;
use clap::{Parser, Subcommand};
use std::ffi::OsString;
use tracing_subscriber::EnvFilter;

mod annotation;
mod args;
mod catalog;
mod client;
mod config;
mod download;
mod env;
mod http;
mod output;
mod queries;
mod query;
mod session;
mod ui;
mod utils;

use crate::args::CLIArgs;

#[derive(Debug, Parser)]
#[command(
    name = "ddb",
    about = "Query and download saved DiscourseDB selections",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List and inspect saved queries
    Queries(CLIArgs<queries::QueriesArgs>),
    /// Run a saved query and save the result as CSV
    Download(CLIArgs<download::DownloadArgs>),
    /// Export data for annotation and upload annotated files
    Annotation(CLIArgs<annotation::AnnotationArgs>),
    /// Manage persistent defaults
    Config(CLIArgs<config::ConfigArgs>),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DDB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();
    env::bootstrap_from_args(&argv)?;
    init_tracing();
    let cli = Cli::parse_from(argv);

    match cli.command {
        Commands::Queries(cmd) => queries::run(cmd.base, cmd.args).await?,
        Commands::Download(cmd) => download::run(cmd.base, cmd.args).await?,
        Commands::Annotation(cmd) => annotation::run(cmd.base, cmd.args).await?,
        Commands::Config(cmd) => config::run(cmd.base, cmd.args)?,
    }

    Ok(())
}
