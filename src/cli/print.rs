//! Proxy sheet generation (`proxysheet print ...`).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use log::debug;
use proxysheet::{CancelFlag, Settings};

use crate::cli::common::PageSizeArg;
use crate::cli::utils::{output_stem, read_decklist};
use crate::cli::{environment, open_context};

/// Arguments for `proxysheet print`.
#[derive(Args, Debug)]
pub struct PrintArgs {
    /// Decklist file (`-` for stdin).
    pub decklist: PathBuf,
    /// Directory receiving one PNG per page.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Paper size.
    #[arg(long, value_enum)]
    pub page_size: Option<PageSizeArg>,
    /// Card scale in percent (90-110).
    #[arg(long)]
    pub scale: Option<u32>,
    /// Output resolution (72-600).
    #[arg(long)]
    pub dpi: Option<u32>,
    /// Leave gutters between cards and draw cut guides in them.
    #[arg(long)]
    pub cut_lines: bool,
    /// Follow each double-faced card with its back face.
    #[arg(long)]
    pub two_sided: bool,
    /// Text printed in the top and bottom margin of every page.
    #[arg(long)]
    pub watermark: Option<String>,
    /// Give up on fetching and layout after this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl PrintArgs {
    /// Command-line flags take precedence over the settings file.
    fn apply(&self, settings: &mut Settings) {
        if let Some(size) = self.page_size {
            settings.page_size = size.into();
        }
        if let Some(scale) = self.scale {
            settings.scale_percent = scale;
        }
        if let Some(dpi) = self.dpi {
            settings.dpi = dpi;
        }
        settings.cut_lines |= self.cut_lines;
        settings.two_sided |= self.two_sided;
        if self.watermark.is_some() {
            settings.watermark = self.watermark.clone();
        }
    }
}

pub async fn handle(args: PrintArgs, data_dir: Option<PathBuf>) -> Result<()> {
    let (paths, mut settings) = environment(data_dir)?;
    args.apply(&mut settings);
    debug!("print settings: {settings:?}");

    let text = read_decklist(&args.decklist)?;
    let ctx = open_context(paths, settings)?;
    ctx.prepare_catalog().await?;

    let entries = ctx.resolve_decklist(&text).await;
    if entries.is_empty() {
        bail!("the decklist has no cards");
    }

    let built = ctx
        .build_document(
            &entries,
            CancelFlag::new(),
            args.timeout.map(Duration::from_secs),
        )
        .await;
    ctx.shutdown().await;
    let document = built?;

    let written = document.save_pages(&args.output, &output_stem(&args.decklist))?;
    let placed = document.placements().count();
    println!(
        "{placed} cards on {} page(s) ({} per page)",
        document.page_count(),
        document.grid().capacity()
    );
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}
