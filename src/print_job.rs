//! Expands resolved decklist entries into the ordered image sequence to print.

use std::fmt;

use crate::card::CardRecord;
use crate::search_line::{MAX_QUANTITY, SearchLine};

/// A decklist line and the printing chosen for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub line: SearchLine,
    pub card: Option<CardRecord>,
}

impl ResolvedEntry {
    pub fn is_resolved(&self) -> bool {
        self.card.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back,
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Face::Front => "front",
            Face::Back => "back",
        })
    }
}

/// One image slot in the output, in placement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintItem {
    pub locator: String,
    pub name: String,
    pub face: Face,
}

/// One item per copy, at most [`MAX_QUANTITY`] per entry. With `two_sided`,
/// a double-faced card's back follows its front immediately so duplex
/// alignment is kept. Unresolved entries are skipped.
pub fn expand_print_items(entries: &[ResolvedEntry], two_sided: bool) -> Vec<PrintItem> {
    let mut items = Vec::new();
    for entry in entries {
        let Some(card) = &entry.card else {
            continue;
        };
        for _ in 0..entry.line.copies() {
            items.push(PrintItem {
                locator: card.images.front.clone(),
                name: card.name.clone(),
                face: Face::Front,
            });
            if two_sided {
                if let Some(back) = &card.images.back {
                    items.push(PrintItem {
                        locator: back.clone(),
                        name: card.name.clone(),
                        face: Face::Back,
                    });
                }
            }
        }
    }
    items
}
