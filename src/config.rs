//! Benchmark configuration, loaded from JSON and overridden by CLI flags.

use crate::core::lookup::{validate_domain, LookupError};
use crate::core::normalize::NormalizeMode;
use crate::core::strategy::StrategyKind;
use crate::io::csv::CsvLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Domain(#[from] LookupError),
    #[error("at least one strategy must be selected")]
    NoStrategies,
    #[error("repeats must be at least 1")]
    ZeroRepeats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub min_value: f32,
    pub max_value: f32,
    pub size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { min_value: 0.1, max_value: 100.0, size: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub table: TableConfig,
    pub newton_iterations: u8,
    pub simd_refine: bool,
    pub mode: NormalizeMode,
    pub layout: CsvLayout,
    pub strategies: Vec<StrategyKind>,
    pub repeats: usize,
    pub pin_core: Option<usize>,
    pub print_vectors: bool,
    pub files: Vec<PathBuf>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            table: TableConfig::default(),
            newton_iterations: 1,
            simd_refine: true,
            mode: NormalizeMode::L2,
            layout: CsvLayout::Rows,
            strategies: StrategyKind::ALL.to_vec(),
            repeats: 1,
            pin_core: None,
            print_vectors: false,
            files: Vec::new(),
        }
    }
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: BenchConfig = serde_json::from_str(&text)?;
        tracing::debug!(?path, "loaded benchmark config");
        Ok(config)
    }

    /// Rejects settings the harness would fail on, before any file is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_domain(self.table.min_value, self.table.max_value, self.table.size)?;
        if self.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }
        if self.repeats == 0 {
            return Err(ConfigError::ZeroRepeats);
        }
        Ok(())
    }
}
