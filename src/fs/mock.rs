// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory filesystem. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    read_only: bool,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// A filesystem whose writes always fail.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        files.insert(path.as_ref().to_path_buf(), content.into());
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.files.lock().map_err(|_| anyhow!("mock fs lock poisoned"))?;
        let bytes = files
            .get(path)
            .ok_or_else(|| anyhow!("file not found: {:?}", path))?;
        Ok(String::from_utf8(bytes.clone())?)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(anyhow!("read-only filesystem: {:?}", path));
        }
        let mut files = self.files.lock().map_err(|_| anyhow!("mock fs lock poisoned"))?;
        files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }
}
