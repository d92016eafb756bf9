//! Findings JSON and SARIF 2.1.0 output.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::{AnalysisResult, AnalyzerMetadata, Diagnostic};

pub fn write_diagnostics_json(path: impl AsRef<Path>, diagnostics: &[Diagnostic]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent).context("create parent directories for diagnostics JSON")?;
    }
    let mut file = File::create(path.as_ref()).context("create diagnostics JSON file")?;
    serde_json::to_writer_pretty(&mut file, diagnostics)
        .context("serialize diagnostics to JSON")?;
    file.write_all(b"\n").ok();
    Ok(())
}

pub fn write_sarif_json(path: impl AsRef<Path>, sarif: &serde_json::Value) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent).context("create parent directories for SARIF JSON")?;
    }
    let mut file = File::create(path.as_ref()).context("create SARIF file")?;
    serde_json::to_writer_pretty(&mut file, sarif).context("serialize SARIF report")?;
    file.write_all(b"\n").ok();
    Ok(())
}

/// One SARIF run covering every result, with the union of analyzers that ran.
pub fn sarif_report(results: &[AnalysisResult]) -> serde_json::Value {
    let mut analyzers: Vec<&AnalyzerMetadata> = Vec::new();
    for result in results {
        for meta in &result.analyzers {
            if !analyzers.iter().any(|known| known.id == meta.id) {
                analyzers.push(*meta);
            }
        }
    }
    let rule_index: HashMap<&str, usize> = analyzers
        .iter()
        .enumerate()
        .map(|(idx, meta)| (meta.id, idx))
        .collect();
    let rule_index = &rule_index;

    let sarif_results: Vec<_> = results
        .iter()
        .flat_map(|result| {
            result.diagnostics.iter().map(move |diag| {
                let mut value = json!({
                    "ruleId": diag.analyzer,
                    "level": diag.severity.sarif_level(),
                    "message": {"text": diag.message},
                    "locations": [
                        {
                            "physicalLocation": {
                                "artifactLocation": {
                                    "uri": diag.location.file,
                                },
                                "region": {
                                    "startLine": diag.location.line,
                                    "startColumn": diag.location.column,
                                }
                            },
                            "logicalLocations": [
                                {
                                    "fullyQualifiedName": result.unit,
                                    "kind": "module",
                                }
                            ]
                        }
                    ],
                    "properties": {
                        "unit": result.unit,
                        "node": diag.node,
                    }
                });
                if let (Some(obj), Some(idx)) =
                    (value.as_object_mut(), rule_index.get(diag.analyzer.as_str()))
                {
                    obj.insert("ruleIndex".to_string(), json!(idx));
                }
                value
            })
        })
        .collect();

    let rules: Vec<_> = analyzers
        .iter()
        .map(|meta| {
            json!({
                "id": meta.id,
                "name": meta.name,
                "shortDescription": {"text": meta.doc},
                "defaultConfiguration": {
                    "level": meta.default_severity.sarif_level()
                },
                "properties": {
                    "requires": meta.requires,
                    "runDespiteErrors": meta.run_despite_errors,
                }
            })
        })
        .collect();

    json!({
        "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
        "version": "2.1.0",
        "runs": [
            {
                "tool": {
                    "driver": {
                        "name": "cast-rules",
                        "version": env!("CARGO_PKG_VERSION"),
                        "rules": rules,
                    }
                },
                "results": sarif_results,
                "invocations": [
                    {
                        "executionSuccessful": true
                    }
                ]
            }
        ]
    })
}
