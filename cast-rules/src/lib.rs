//! Analyzers for unsafe memory reinterpretation in type-checked units.
//!
//! The engine runs a static table of analyzers over a [`CompilationUnit`],
//! one sink per unit, and hands back the unit's diagnostics in tree pre-order
//! whichever analyzer produced them.

use std::fmt;

use cast_ir::{CompilationUnit, Location, NodeId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

pub mod config;
pub mod idiom;
pub mod report;
pub mod rules;
pub mod shape;

pub use config::AnalysisConfig;
pub use report::{sarif_report, write_diagnostics_json, write_sarif_json};
pub use rules::header::{HeaderMisuseAnalyzer, HEADER_MISUSE_METADATA};
pub use rules::structcast::{StructCastAnalyzer, STRUCT_CAST_METADATA};
pub use rules::BUILTIN_ANALYZERS;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Note,
    #[default]
    Warning,
    Error,
}

impl Severity {
    pub fn sarif_level(&self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sarif_level())
    }
}

/// Inputs an analyzer reads from the unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    SyntaxTree,
    TypeInfo,
    ControlFlow,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalyzerMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub doc: &'static str,
    pub requires: &'static [Requirement],
    /// Run even when the front end reported errors for the unit.
    pub run_despite_errors: bool,
    pub default_severity: Severity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Id of the reporting analyzer
    pub analyzer: String,
    pub location: Location,
    pub message: String,
    pub severity: Severity,
    pub node: NodeId,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {} [{}]",
            self.location, self.severity, self.message, self.analyzer
        )
    }
}

/// Append-only, ordered diagnostic collection for one unit.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// What an analyzer sees while it runs over one unit.
pub struct Pass<'a> {
    unit: &'a CompilationUnit,
    config: &'a AnalysisConfig,
    analyzer: &'static AnalyzerMetadata,
    severity: Severity,
    sink: &'a mut DiagnosticSink,
}

impl<'a> Pass<'a> {
    pub fn new(
        unit: &'a CompilationUnit,
        config: &'a AnalysisConfig,
        analyzer: &'static AnalyzerMetadata,
        sink: &'a mut DiagnosticSink,
    ) -> Self {
        Self {
            unit,
            config,
            analyzer,
            severity: config.severity_for(analyzer),
            sink,
        }
    }

    pub fn unit(&self) -> &'a CompilationUnit {
        self.unit
    }

    pub fn config(&self) -> &'a AnalysisConfig {
        self.config
    }

    pub fn analyzer(&self) -> &'static AnalyzerMetadata {
        self.analyzer
    }

    pub fn report(&mut self, node: NodeId, message: impl Into<String>) {
        let location = self.unit.location(node).unwrap_or_default();
        self.sink.push(Diagnostic {
            analyzer: self.analyzer.id.to_string(),
            location,
            message: message.into(),
            severity: self.severity,
            node,
        });
    }
}

pub trait Analyzer: Send + Sync {
    fn metadata(&self) -> &'static AnalyzerMetadata;
    fn run(&self, pass: &mut Pass<'_>);

    fn cache_key(&self) -> String {
        serde_json::to_string(self.metadata()).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    /// Name of the analyzed unit
    pub unit: String,
    pub diagnostics: Vec<Diagnostic>,
    /// Analyzers that actually ran over the unit
    pub analyzers: Vec<&'static AnalyzerMetadata>,
    /// [`AnalyzerEngine::fingerprint`] of the engine that produced this result
    pub fingerprint: String,
}

pub struct AnalyzerEngine {
    analyzers: Vec<&'static dyn Analyzer>,
    config: AnalysisConfig,
}

impl Default for AnalyzerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerEngine {
    pub fn new() -> Self {
        Self {
            analyzers: Vec::new(),
            config: AnalysisConfig::default(),
        }
    }

    pub fn with_builtin_analyzers() -> Self {
        let mut engine = AnalyzerEngine::new();
        for analyzer in BUILTIN_ANALYZERS {
            engine.register(*analyzer);
        }
        engine
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn register(&mut self, analyzer: &'static dyn Analyzer) {
        self.analyzers.push(analyzer);
    }

    pub fn analyzer_metadata(&self) -> Vec<&'static AnalyzerMetadata> {
        self.analyzers
            .iter()
            .map(|analyzer| analyzer.metadata())
            .collect()
    }

    /// Runs every enabled analyzer over `unit` in registration order.
    pub fn run(&self, unit: &CompilationUnit) -> AnalysisResult {
        let mut sink = DiagnosticSink::new();
        let mut ran = Vec::new();

        for analyzer in &self.analyzers {
            let metadata = analyzer.metadata();
            if self.config.is_disabled(metadata) {
                debug!(analyzer = metadata.name, unit = %unit.name, "analyzer disabled by config");
                continue;
            }
            if unit.has_upstream_errors() && !metadata.run_despite_errors {
                debug!(
                    analyzer = metadata.name,
                    unit = %unit.name,
                    errors = unit.upstream_errors.len(),
                    "skipping analyzer on unit with upstream errors"
                );
                continue;
            }

            let before = sink.len();
            let mut pass = Pass::new(unit, &self.config, metadata, &mut sink);
            analyzer.run(&mut pass);
            debug!(
                analyzer = metadata.name,
                unit = %unit.name,
                diagnostics = sink.len() - before,
                "analyzer finished"
            );
            ran.push(metadata);
        }

        let mut diagnostics = sink.into_vec();
        sort_by_preorder(unit, &mut diagnostics);

        AnalysisResult {
            unit: unit.name.clone(),
            diagnostics,
            analyzers: ran,
            fingerprint: self.fingerprint(),
        }
    }

    /// Analyzes independent units in parallel; results keep the input order.
    pub fn run_units(&self, units: &[CompilationUnit]) -> Vec<AnalysisResult> {
        units.par_iter().map(|unit| self.run(unit)).collect()
    }

    /// Hash over the registered analyzers and the configuration, for caching
    /// results across runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for analyzer in &self.analyzers {
            hasher.update(analyzer.cache_key().as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(serde_json::to_string(&self.config).unwrap_or_default());
        hex::encode(hasher.finalize())
    }
}

/// Orders `diagnostics` by the pre-order position of their node. The sort is
/// stable, so findings on the same node keep analyzer order; nodes outside
/// the walk go last.
fn sort_by_preorder(unit: &CompilationUnit, diagnostics: &mut [Diagnostic]) {
    let mut rank = vec![usize::MAX; unit.tree.len()];
    let mut next = 0usize;
    unit.tree.preorder(|id, _| {
        if let Some(slot) = rank.get_mut(id.index()) {
            *slot = next;
            next += 1;
        }
    });
    diagnostics.sort_by_key(|diag| rank.get(diag.node.index()).copied().unwrap_or(usize::MAX));
}

pub fn analyze(unit: &CompilationUnit) -> AnalysisResult {
    AnalyzerEngine::with_builtin_analyzers().run(unit)
}

pub fn analyze_with_engine(engine: &AnalyzerEngine, unit: &CompilationUnit) -> AnalysisResult {
    engine.run(unit)
}
