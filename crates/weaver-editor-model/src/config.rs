//! Model configuration loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::Result;
use crate::ids::{IdGenerator, RandomIds, SequentialIds};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub paste: PasteConfig,
    pub ids: IdConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasteConfig {
    /// Annotation types kept when pasting into a text property outside any container.
    pub plain_annotation_types: Vec<SmolStr>,
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            plain_annotation_types: vec![
                SmolStr::new_static("strong"),
                SmolStr::new_static("emphasis"),
                SmolStr::new_static("link"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    pub strategy: IdStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// `{type}-{n}`, deterministic.
    #[default]
    Sequential,
    /// `{type}-{16 hex digits}`.
    Random,
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), strategy = ?config.ids.strategy, "loaded model config");
        Ok(config)
    }

    pub fn id_generator(&self) -> Box<dyn IdGenerator> {
        match self.ids.strategy {
            IdStrategy::Sequential => Box::new(SequentialIds::new()),
            IdStrategy::Random => Box::new(RandomIds),
        }
    }

    pub fn keeps_plain_annotation(&self, node_type: &str) -> bool {
        self.paste
            .plain_annotation_types
            .iter()
            .any(|t| t == node_type)
    }
}
