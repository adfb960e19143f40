//! Local catalog maintenance (`proxysheet catalog ...`).

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use proxysheet::{CardRecord, Freshness};

use crate::cli::{environment, open_context};

/// Supported `proxysheet catalog` subcommands.
#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
    /// Download the current bulk card file.
    Refresh(RefreshArgs),
    /// Show what the local catalog holds and how old it is.
    Info,
    /// Look a card up by name, locally first and then remotely.
    Find(FindArgs),
}

/// Arguments for `proxysheet catalog refresh`.
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Download even if the catalog is still fresh.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `proxysheet catalog find`.
#[derive(Args, Debug)]
pub struct FindArgs {
    /// Card name; quote names with spaces.
    #[arg(required = true, num_args = 1..)]
    pub name: Vec<String>,
}

pub async fn handle(command: CatalogCommand, data_dir: Option<PathBuf>) -> Result<()> {
    let (paths, settings) = environment(data_dir)?;
    let ctx = open_context(paths, settings)?;
    match command {
        CatalogCommand::Refresh(args) => {
            ctx.refresh_catalog(args.force).await?;
        }
        CatalogCommand::Info => {
            let freshness = ctx.freshness().await;
            let catalog = ctx.catalog().await;
            let metadata = catalog.metadata();
            println!("File      : {}", ctx.paths().catalog_file().display());
            println!("Cards     : {}", catalog.len());
            match catalog.last_updated() {
                Some(at) => println!("Refreshed : {}", at.to_rfc3339()),
                None => println!("Refreshed : never"),
            }
            if !metadata.name.is_empty() {
                println!("Source    : {} (updated {})", metadata.name, metadata.updated_at);
            }
            println!("Status    : {}", describe(freshness));
        }
        CatalogCommand::Find(args) => {
            let name = args.name.join(" ");
            let card = ctx
                .find_card(&name)
                .await
                .ok_or_else(|| anyhow!("no results for '{name}'"))?;
            print_card(&card);
        }
    }
    Ok(())
}

fn describe(freshness: Freshness) -> &'static str {
    match freshness {
        Freshness::NeverUpdated => "never downloaded; run `proxysheet catalog refresh`",
        Freshness::Stale => "stale; consider `proxysheet catalog refresh`",
        Freshness::Fresh => "fresh",
    }
}

fn print_card(card: &CardRecord) {
    println!("{card}");
    println!("  oracle   : {}", card.oracle_id);
    println!("  printing : {}", card.printing_id);
    if !card.set_name.is_empty() {
        println!("  set      : {} [{}]", card.set_name, card.lang);
    }
    if let Some(usd) = &card.prices.usd {
        println!("  usd      : {usd}");
    }
    if let Some(legality) = card.legality("commander") {
        println!("  commander: {legality}");
    }
    println!("  front    : {}", card.images.front);
    if let Some(back) = &card.images.back {
        println!("  back     : {back}");
    }
    if card.is_token {
        println!("  (token)");
    }
}
