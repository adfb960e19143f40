//! Shared clap helper types for CLI commands.

use clap::ValueEnum;
use proxysheet::PageSize;

/// Paper sizes accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum PageSizeArg {
    A4,
    A3,
    Letter,
    Legal,
}

impl From<PageSizeArg> for PageSize {
    fn from(value: PageSizeArg) -> PageSize {
        match value {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::A3 => PageSize::A3,
            PageSizeArg::Letter => PageSize::Letter,
            PageSizeArg::Legal => PageSize::Legal,
        }
    }
}
