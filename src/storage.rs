//! On-disk locations and write-replace persistence helpers.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::Serialize;

const CATALOG_FILE: &str = "catalog.json";
const PREFERENCES_FILE: &str = "preferences.json";
const SETTINGS_FILE: &str = "settings.json";

/// Where the catalog, preferences and settings live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl StoragePaths {
    /// OS-local application directories (e.g. `~/.local/share/proxysheet`).
    pub fn from_os() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "proxysheet")
            .ok_or_else(|| anyhow!("no home directory available for application data"))?;
        Ok(Self {
            data_dir: dirs.data_dir().to_path_buf(),
            config_dir: dirs.config_dir().to_path_buf(),
        })
    }

    /// Keep everything under a single directory; used by `--data-dir` and tests.
    pub fn rooted_at<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        Self {
            data_dir: root.clone(),
            config_dir: root,
        }
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }

    pub fn preferences_file(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }
}

/// Serialize `value` as JSON to `path` without ever truncating the previous copy.
///
/// The document is written to a sibling temp file first and renamed over the
/// target only after a successful flush.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let tmp = temp_sibling(path);
    let written = (|| -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .with_context(|| format!("failed to open {}", tmp.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)
            .with_context(|| format!("failed to serialize {}", path.display()))?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|err| anyhow!("failed to flush {}: {}", tmp.display(), err.error()))?
            .sync_all()?;
        Ok(())
    })();

    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}

/// Keeps concurrent saves of one file within a process on separate temp files.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    name.push(format!(".{}.{}.tmp", std::process::id(), seq));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/deeper/out.json");
        let mut value = BTreeMap::new();
        value.insert("a", 1);
        write_json_atomic(&target, &value).unwrap();
        let text = fs::read_to_string(&target).unwrap();
        assert_eq!(text, r#"{"a":1}"#);
    }

    #[test]
    fn replaces_previous_copy_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.json");
        write_json_atomic(&target, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&target, &vec![4]).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "[4]");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn concurrent_saves_of_one_file_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("prefs.json");
        std::thread::scope(|scope| {
            for n in 0..8 {
                let target = &target;
                scope.spawn(move || {
                    for _ in 0..10 {
                        write_json_atomic(target, &vec![n; 64]).unwrap();
                    }
                });
            }
        });
        let saved: Vec<i32> = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(saved.len(), 64);
        assert!(saved.iter().all(|&v| v == saved[0]));
        assert_ne!(temp_sibling(&target), temp_sibling(&target));
    }

    #[test]
    fn rooted_paths_share_one_directory() {
        let paths = StoragePaths::rooted_at("/tmp/proxy");
        assert_eq!(paths.catalog_file(), PathBuf::from("/tmp/proxy/catalog.json"));
        assert_eq!(paths.settings_file(), PathBuf::from("/tmp/proxy/settings.json"));
    }
}
