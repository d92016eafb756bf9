//! Analysis settings loaded from YAML.
//!
//! ```yaml
//! path_search_budget: 1000
//! disabled_analyzers: [struct-cast]
//! severity_overrides:
//!   UCAST001: error
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cast_ir::DEFAULT_STEP_BUDGET;
use serde::{Deserialize, Serialize};

use crate::{AnalyzerMetadata, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Block expansions allowed when searching a function's CFG for a statement
    pub path_search_budget: usize,
    /// Analyzer ids or names that should not run
    pub disabled_analyzers: Vec<String>,
    /// Severity per analyzer id or name, replacing the analyzer's default
    pub severity_overrides: BTreeMap<String, Severity>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            path_search_budget: DEFAULT_STEP_BUDGET,
            disabled_analyzers: Vec::new(),
            severity_overrides: BTreeMap::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("parse config file {}", path.display()))
    }

    /// An empty document yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("parse analysis config YAML")
    }

    pub fn is_disabled(&self, analyzer: &AnalyzerMetadata) -> bool {
        self.disabled_analyzers
            .iter()
            .any(|entry| entry == analyzer.id || entry == analyzer.name)
    }

    pub fn severity_for(&self, analyzer: &AnalyzerMetadata) -> Severity {
        self.severity_overrides
            .get(analyzer.id)
            .or_else(|| self.severity_overrides.get(analyzer.name))
            .copied()
            .unwrap_or(analyzer.default_severity)
    }
}
