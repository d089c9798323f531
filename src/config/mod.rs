use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::errors::{EngineError, Result};
use crate::ledger::RefreshDay;

const CONFIG_DIR: &str = "budget_cycle";
const CONFIG_FILE: &str = "config.json";
const BOOK_FILE: &str = "book.json";
const TMP_SUFFIX: &str = "tmp";

/// Engine settings, loaded from disk with sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Refresh day assigned to scopes that never chose one.
    pub default_refresh_day: u32,
    /// Upper bound on periods created in one backfill walk; a sane
    /// inactivity window, not a tuning knob.
    pub max_backfill_periods: usize,
    /// Where the JSON book lives; defaults next to the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_refresh_day: 1,
            max_backfill_periods: 120,
            book_path: None,
        }
    }
}

impl EngineConfig {
    /// Validates the configured refresh day.
    pub fn refresh_day(&self) -> Result<RefreshDay> {
        RefreshDay::new(self.default_refresh_day)
    }
}

/// Loads and saves the engine configuration under the user's config dir.
pub struct ConfigManager {
    path: PathBuf,
    base: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| EngineError::Config("no config directory available".into()))?
            .join(CONFIG_DIR);
        Self::from_base(base)
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
            base,
        })
    }

    pub fn load(&self) -> Result<EngineConfig> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            serde_json::from_str(&data)
                .map_err(|err| EngineError::Config(format!("invalid config: {err}")))
        } else {
            Ok(EngineConfig::default())
        }
    }

    pub fn save(&self, config: &EngineConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_all(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Resolved location of the JSON book.
    pub fn book_path(&self, config: &EngineConfig) -> PathBuf {
        config
            .book_path
            .clone()
            .unwrap_or_else(|| self.base.join(BOOK_FILE))
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
