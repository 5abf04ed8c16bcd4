//! Per-operation model configuration.
//!
//! Pure data: which model, temperature and output budget each operation
//! type is sent upstream with. Changing the table changes behaviour but not
//! design.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::operation::OperationType;

/// Upstream parameters for one operation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier (e.g. "gpt-4o-mini").
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum completion tokens.
    pub max_tokens: u32,
}

impl ModelConfig {
    /// Create a model config.
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

/// Mapping from operation type to [`ModelConfig`].
///
/// Every operation always resolves: entries not overridden fall back to the
/// built-in defaults.
#[derive(Debug, Clone)]
pub struct ModelTable {
    entries: HashMap<OperationType, ModelConfig>,
}

impl Default for ModelTable {
    fn default() -> Self {
        let entries = OperationType::ALL
            .into_iter()
            .map(|op| (op, default_model_config(op)))
            .collect();
        Self { entries }
    }
}

impl ModelTable {
    /// Create a table populated with the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the configuration for one operation.
    pub fn with(mut self, operation: OperationType, config: ModelConfig) -> Self {
        self.set(operation, config);
        self
    }

    /// Override the configuration for one operation in place.
    pub fn set(&mut self, operation: OperationType, config: ModelConfig) {
        self.entries.insert(operation, config);
    }

    /// Configuration for an operation.
    pub fn get(&self, operation: OperationType) -> ModelConfig {
        self.entries
            .get(&operation)
            .cloned()
            .unwrap_or_else(|| default_model_config(operation))
    }
}

fn default_model_config(operation: OperationType) -> ModelConfig {
    match operation {
        OperationType::ResumeGeneration => ModelConfig::new("gpt-4o", 0.7, 3000),
        OperationType::CoverLetter => ModelConfig::new("gpt-4o", 0.7, 1500),
        OperationType::AtsScoring => ModelConfig::new("gpt-4o-mini", 0.2, 1500),
        OperationType::JobExtraction => ModelConfig::new("gpt-4o-mini", 0.1, 1500),
        OperationType::SkillGapAnalysis => ModelConfig::new("gpt-4o-mini", 0.3, 1500),
    }
}
