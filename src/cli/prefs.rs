//! Artwork preference management (`proxysheet prefs ...`).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::cli::{environment, open_context};

/// Supported `proxysheet prefs` subcommands.
#[derive(Subcommand, Debug)]
pub enum PrefsCommand {
    /// List every recorded preferred printing.
    List,
    /// Prefer the printing of a card from a given set.
    Set(PrefsSetArgs),
    /// Forget the preferred printing of a card.
    Clear(PrefsClearArgs),
}

/// Arguments for `proxysheet prefs set`.
#[derive(Args, Debug)]
pub struct PrefsSetArgs {
    /// Card name.
    pub name: String,
    /// Set code, e.g. `m10`.
    #[arg(long = "set")]
    pub set: String,
    /// Collector number, when the set has several printings.
    #[arg(long)]
    pub number: Option<String>,
}

/// Arguments for `proxysheet prefs clear`.
#[derive(Args, Debug)]
pub struct PrefsClearArgs {
    /// Card name.
    pub name: String,
}

pub async fn handle(command: PrefsCommand, data_dir: Option<PathBuf>) -> Result<()> {
    let (paths, settings) = environment(data_dir)?;
    let ctx = open_context(paths, settings)?;
    match command {
        PrefsCommand::List => {
            let entries = ctx.preference_entries().await;
            if entries.is_empty() {
                println!("no preferred printings recorded");
            }
            for entry in entries {
                match entry.card {
                    Some(card) => println!("{card}"),
                    None => println!("{} -> {}", entry.oracle_id, entry.printing_id),
                }
            }
        }
        PrefsCommand::Set(args) => {
            let chosen = ctx
                .choose_printing(&args.name, &args.set, args.number.as_deref())
                .await?;
            println!("preferring {chosen}");
        }
        PrefsCommand::Clear(args) => match ctx.clear_preference(&args.name).await? {
            Some(_) => println!("cleared preference for {}", args.name),
            None => println!("no preference recorded for {}", args.name),
        },
    }
    Ok(())
}
