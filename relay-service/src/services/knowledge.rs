//! The knowledge block: the only facts the model may answer from.

use crate::config::KnowledgeConfig;
use service_core::error::AppError;
use std::sync::Arc;

/// Knowledge text baked into the binary.
const BUILTIN_KNOWLEDGE: &str = include_str!("../../knowledge/profile.txt");

/// Immutable knowledge text shared by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeBlock(Arc<str>);

impl KnowledgeBlock {
    pub fn builtin() -> Self {
        Self(Arc::from(BUILTIN_KNOWLEDGE.trim()))
    }

    /// Wrap caller-supplied text. Blank text is rejected.
    pub fn new(text: &str) -> Result<Self, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "knowledge block must not be empty"
            )));
        }
        Ok(Self(Arc::from(text)))
    }

    /// Resolve the block once at startup: the file at `path` if set, else the built-in text.
    pub fn load(config: &KnowledgeConfig) -> Result<Self, AppError> {
        let Some(path) = &config.path else {
            return Ok(Self::builtin());
        };

        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "failed to read KNOWLEDGE_PATH {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::info!(path = %path.display(), bytes = text.len(), "Loaded knowledge block from file");
        Self::new(&text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
