//! Command-line interface wiring for the `proxysheet` binary.
//!
//! This module owns the clap definitions and delegates execution to the
//! submodule for each command family.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use proxysheet::{ProxyContext, Reporter, Settings, StoragePaths};

pub mod catalog;
pub mod common;
pub mod parse;
pub mod prefs;
pub mod print;
pub mod utils;

/// Parsed CLI entrypoint for the `proxysheet` binary.
#[derive(Parser, Debug)]
#[command(
    name = "proxysheet",
    version,
    about = "Turn decklists into printable pages of card proxies"
)]
pub struct Cli {
    /// Keep catalog, preferences and settings in this directory.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Log debug output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Top-level command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// High-level command families made available to end users.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download and query the local card catalog.
    #[command(subcommand)]
    Catalog(catalog::CatalogCommand),
    /// Choose which printing of a card gets printed.
    #[command(subcommand)]
    Prefs(prefs::PrefsCommand),
    /// Build proxy pages from a decklist.
    Print(print::PrintArgs),
    /// Show how a decklist is read, without looking anything up.
    Parse(parse::ParseArgs),
}

/// Prints status messages to stderr so stdout stays clean for results.
struct StderrReporter;

impl Reporter for StderrReporter {
    fn status(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Storage locations and settings, honouring `--data-dir`.
pub fn environment(data_dir: Option<PathBuf>) -> Result<(StoragePaths, Settings)> {
    let paths = match data_dir {
        Some(dir) => StoragePaths::rooted_at(dir),
        None => StoragePaths::from_os()?,
    };
    let settings = Settings::load(&paths.settings_file());
    Ok((paths, settings))
}

pub fn open_context(paths: StoragePaths, settings: Settings) -> Result<ProxyContext> {
    Ok(ProxyContext::open(paths, settings)?.with_reporter(Arc::new(StderrReporter)))
}

/// Execute the requested command.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Catalog(cmd) => catalog::handle(cmd, cli.data_dir).await,
        Command::Prefs(cmd) => prefs::handle(cmd, cli.data_dir).await,
        Command::Print(args) => print::handle(args, cli.data_dir).await,
        Command::Parse(args) => parse::handle(args),
    }
}
