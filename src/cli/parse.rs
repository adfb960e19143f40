//! Decklist inspection (`proxysheet parse ...`).

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use proxysheet::parse_decklist;

use crate::cli::utils::read_decklist;

/// Arguments for `proxysheet parse`.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Decklist file (`-` for stdin).
    pub decklist: PathBuf,
}

pub fn handle(args: ParseArgs) -> Result<()> {
    let text = read_decklist(&args.decklist)?;
    let lines = parse_decklist(&text);
    for line in &lines {
        println!("{:>4}  {}", line.quantity, line.term);
    }
    let total: u64 = lines.iter().map(|l| u64::from(l.quantity)).sum();
    println!("{} lines, {} cards", lines.len(), total);
    Ok(())
}
