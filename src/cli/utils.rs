//! Convenience helpers shared across command handlers.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Read a decklist from `path`, or from stdin when it is `-`.
pub fn read_decklist(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        return read_stdin();
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Read the entire stdin stream into memory.
pub fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read from stdin")?;
    Ok(buffer)
}

/// Output file stem for a decklist path; `deck` for stdin.
pub fn output_stem(path: &Path) -> String {
    if path.as_os_str() == "-" {
        return "deck".to_string();
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "deck".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stem_follows_the_decklist_name() {
        assert_eq!(output_stem(Path::new("decks/burn.txt")), "burn");
        assert_eq!(output_stem(Path::new("-")), "deck");
    }

    #[test]
    fn reads_decklist_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "4 Opt\n").unwrap();
        assert_eq!(read_decklist(&path).unwrap(), "4 Opt\n");
        assert!(read_decklist(&dir.path().join("missing.txt")).is_err());
    }
}
