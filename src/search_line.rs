//! Decklist line parsing.

use std::fmt;

/// Most copies of a single line that will be printed.
pub const MAX_QUANTITY: u32 = 999;

/// One decklist line split into a copy count and the text to search for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLine {
    pub quantity: u32,
    pub term: String,
}

impl SearchLine {
    /// Copies to print: the quantity, capped at [`MAX_QUANTITY`].
    pub fn copies(&self) -> u32 {
        self.quantity.min(MAX_QUANTITY)
    }
}

impl fmt::Display for SearchLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.term)
    }
}

/// Split a raw line into `(quantity, term)`.
///
/// The first whitespace-delimited token is the quantity only when it is made
/// entirely of ASCII digits. Anything else (including `4x`) stays part of the
/// term and the quantity defaults to 1. A zero count is raised to 1, and a
/// count too large for `u32` saturates. Never fails: the worst case is an
/// empty term.
pub fn parse_search_line(line: &str) -> SearchLine {
    let mut tokens = line.split_whitespace().peekable();

    let quantity = match tokens.peek() {
        Some(first) if first.bytes().all(|b| b.is_ascii_digit()) => {
            let parsed = first.parse::<u32>().unwrap_or(u32::MAX);
            tokens.next();
            parsed.max(1)
        }
        _ => 1,
    };

    let term = tokens.collect::<Vec<_>>().join(" ");
    SearchLine { quantity, term }
}

/// Parse a whole decklist, skipping blank lines, comments and lines with no term.
pub fn parse_decklist(text: &str) -> Vec<SearchLine> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("//"))
        .map(parse_search_line)
        .filter(|parsed| !parsed.term.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(quantity: u32, term: &str) -> SearchLine {
        SearchLine {
            quantity,
            term: term.to_string(),
        }
    }

    #[test]
    fn leading_number_is_quantity() {
        assert_eq!(parse_search_line("4 Lightning Bolt"), line(4, "Lightning Bolt"));
    }

    #[test]
    fn missing_number_defaults_to_one() {
        assert_eq!(parse_search_line("Counterspell"), line(1, "Counterspell"));
    }

    #[test]
    fn mixed_token_stays_in_term() {
        assert_eq!(parse_search_line("4x Island"), line(1, "4x Island"));
        assert_eq!(parse_search_line("3rd Eye"), line(1, "3rd Eye"));
    }

    #[test]
    fn collapses_blank_tokens() {
        assert_eq!(parse_search_line("  2\t  Black   Lotus  "), line(2, "Black Lotus"));
    }

    #[test]
    fn malformed_input_never_fails() {
        assert_eq!(parse_search_line(""), line(1, ""));
        assert_eq!(parse_search_line("   "), line(1, ""));
        assert_eq!(parse_search_line("7"), line(7, ""));
        assert_eq!(parse_search_line("0 Opt"), line(1, "Opt"));
        assert_eq!(parse_search_line("99999999999 Opt"), line(u32::MAX, "Opt"));
        assert_eq!(parse_search_line("1 Cut // Ribbons"), line(1, "Cut // Ribbons"));
    }

    #[test]
    fn copies_are_capped() {
        assert_eq!(parse_search_line("4 Opt").copies(), 4);
        assert_eq!(parse_search_line("99999999999 Opt").copies(), MAX_QUANTITY);
    }

    #[test]
    fn decklist_skips_comments_and_blanks() {
        let text = "# main deck\n4 Lightning Bolt\n\n// sideboard\n2 Pyroblast\n3\n";
        assert_eq!(
            parse_decklist(text),
            vec![line(4, "Lightning Bolt"), line(2, "Pyroblast")]
        );
    }
}
