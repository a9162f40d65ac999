use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_KEY;

pub const DEFAULT_DATA_DIR: &str = ".minion-tracker";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct TrackerConfig {
    /// Directory holding the `<key>.json` records.
    pub data_dir: PathBuf,
    /// Record name for the roster.
    pub key: String,
    /// Seed for reproducible minion ids.
    pub seed: Option<u64>,
    /// Pretty-print JSON on disk.
    pub pretty: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            key: DEFAULT_KEY.to_string(),
            seed: None,
            pretty: true,
        }
    }
}

impl TrackerConfig {
    /// Load from YAML (`.yaml`/`.yml`) or JSON (anything else).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let cfg = Self::parse(&text, is_yaml(path))
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn parse(text: &str, yaml: bool) -> Result<Self> {
        let cfg: Self = if yaml {
            serde_yaml::from_str(text)?
        } else {
            serde_json::from_str(text)?
        };
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let key = self.key.trim();
        if key.is_empty() {
            bail!("record key must not be empty");
        }
        if key != self.key {
            bail!("record key '{}' has surrounding whitespace", self.key);
        }
        if key.contains(['/', '\\']) || key.starts_with('.') {
            bail!("record key '{}' is not a plain file name", self.key);
        }
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}
