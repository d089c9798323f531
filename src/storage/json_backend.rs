//! JSON snapshot backend: loads the whole book into a [`MemoryStore`]
//! and writes it back atomically.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::Result;
use crate::storage::memory::{BookSnapshot, MemoryStore};

const TMP_SUFFIX: &str = "tmp";

/// File-backed persistence for one budget book.
pub struct JsonBookBackend {
    path: PathBuf,
}

impl JsonBookBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the book, or an empty one when the file does not exist yet.
    pub fn load(&self) -> Result<MemoryStore> {
        if !self.path.exists() {
            return Ok(MemoryStore::new());
        }
        let data = fs::read_to_string(&self.path)?;
        let snapshot: BookSnapshot = serde_json::from_str(&data)?;
        Ok(MemoryStore::from_snapshot(snapshot))
    }

    /// Persists the store with a temp-file rename so a crashed write
    /// never truncates the book.
    pub fn save(&self, store: &MemoryStore) -> Result<()> {
        let snapshot = store.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&self.path);
        write_all(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_all(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
