//! LocalActionFlag storage: which counters this browser already acted on.
//! Flags are never shared between browsers or devices.
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::SyncError;

pub trait FlagStore {
    fn is_set(&self, flag: &str) -> bool;

    fn set(&mut self, flag: &str) -> Result<(), SyncError>;
}

#[derive(Debug, Default)]
pub struct MemoryFlags {
    flags: BTreeSet<String>,
}

impl FlagStore for MemoryFlags {
    fn is_set(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    fn set(&mut self, flag: &str) -> Result<(), SyncError> {
        self.flags.insert(flag.to_string());
        Ok(())
    }
}

/// Flags kept in a JSON array on disk and rewritten on every [FlagStore::set],
/// so they survive a reload.
#[derive(Debug)]
pub struct FileFlags {
    path: PathBuf,
    flags: BTreeSet<String>,
}

impl FileFlags {
    /// A missing file is an empty set.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref().to_path_buf();

        let flags = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            debug!("No flag file at {}, starting empty", path.display());
            BTreeSet::new()
        };

        Ok(Self { path, flags })
    }
}

impl FlagStore for FileFlags {
    fn is_set(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    fn set(&mut self, flag: &str) -> Result<(), SyncError> {
        if self.flags.insert(flag.to_string()) {
            fs::write(&self.path, serde_json::to_string(&self.flags)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_flags_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");

        let mut flags = FileFlags::open(&path).unwrap();
        assert!(!flags.is_set("like:article1"));
        flags.set("like:article1").unwrap();

        let reopened = FileFlags::open(&path).unwrap();
        assert!(reopened.is_set("like:article1"));
        assert!(!reopened.is_set("vote:trolley"));
    }

    #[test]
    fn test_corrupt_flag_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(FileFlags::open(&path), Err(SyncError::Json(_))));
    }
}
