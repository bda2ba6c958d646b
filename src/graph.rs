//! Graph merge and classification: the `analyze_project` entry point.

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::backend::{BackendFailure, BackendKind, BackendRegistry};
use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::model::{DependencyEdge, Diagnostic, DiagnosticKind, ProjectGraph, Role, SourceEntity};
use crate::resolver::{self, IdentifierCollision};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Succeeded,
    /// Ran, found nothing to analyse.
    Empty,
    /// Contribution discarded whole.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendReport {
    pub name: String,
    pub status: BackendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Units enumerated in phase 1.
    pub units: usize,
    /// Entities contributed to the graph.
    pub entities: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub project_root: String,
    pub graph: ProjectGraph,
    pub backends: Vec<BackendReport>,
    pub collisions: Vec<IdentifierCollision>,
    pub diagnostics: Vec<Diagnostic>,
    pub fingerprint: String,
}

impl AnalysisReport {
    /// At least one backend failed while the run as a whole succeeded.
    pub fn is_partial(&self) -> bool {
        self.backends.iter().any(|b| b.status == BackendStatus::Failed)
    }

    pub fn backend(&self, name: &str) -> Option<&BackendReport> {
        self.backends.iter().find(|b| b.name == name)
    }
}

/// Run every applicable backend over `root` and merge their results into one graph.
///
/// Fails only when the root is missing, the config is invalid, or every active
/// backend failed; anything less yields a (possibly partial) report.
pub fn analyze_project(root: &Path, config: &Config, skip: &[BackendKind]) -> Result<AnalysisReport> {
    if !root.is_dir() {
        return Err(AnalysisError::ProjectRootMissing {
            path: root.to_path_buf(),
        });
    }
    config.validate()?;

    tracing::info!("analyzing {}", root.display());
    let mut registry = BackendRegistry::detect(root, config, skip);
    if registry.is_empty() {
        tracing::warn!("no backend applies to {}", root.display());
    }

    let mut identities = resolver::collect_identities(&registry, config.limits.max_files);
    let resolution = resolver::resolve_units(&registry, &identities);

    let mut failures: Vec<BackendFailure> = std::mem::take(&mut registry.failures);
    failures.append(&mut identities.failures);

    let active = registry.backends.len() + unopened_count(&failures, &registry);
    if active > 0 && failures.len() == active {
        return Err(AnalysisError::AllBackendsFailed {
            failures: failures
                .iter()
                .map(|f| format!("{}: {}", f.kind.as_str(), f.error))
                .collect(),
        });
    }

    let graph = merge(resolution.entities, resolution.edges, &resolution.failed);

    let mut backends: Vec<BackendReport> = Vec::new();
    for kind in BackendKind::ALL {
        if let Some(f) = failures.iter().find(|f| f.kind == kind) {
            backends.push(BackendReport {
                name: kind.as_str().to_string(),
                status: BackendStatus::Failed,
                reason: Some(f.error.to_string()),
                units: 0,
                entities: 0,
            });
            continue;
        }
        if !registry.backends.iter().any(|(k, _)| *k == kind) {
            continue;
        }
        let units = identities.unit_counts.get(&kind).copied().unwrap_or(0);
        let entities = graph.entities.iter().filter(|e| e.language == kind.as_str()).count();
        backends.push(BackendReport {
            name: kind.as_str().to_string(),
            status: if units == 0 {
                BackendStatus::Empty
            } else {
                BackendStatus::Succeeded
            },
            reason: None,
            units,
            entities,
        });
    }

    let mut diagnostics: Vec<Diagnostic> = failures
        .iter()
        .map(|f| Diagnostic::new(DiagnosticKind::BackendFailed, f.kind.as_str(), f.error.to_string()))
        .collect();
    diagnostics.extend(identities.diagnostics);
    diagnostics.extend(resolution.diagnostics);
    diagnostics.sort();

    let fingerprint = graph.fingerprint();
    tracing::info!(
        "graph for {}: {} entities, {} edges, {} entry points",
        root.display(),
        graph.entities.len(),
        graph.edges.len(),
        graph.entry_points.len()
    );

    Ok(AnalysisReport {
        project_root: root.display().to_string(),
        graph,
        backends,
        collisions: identities.collisions,
        diagnostics,
        fingerprint,
    })
}

/// Failures of backends that never made it into the registry (open errors)
/// count as active backends of their own.
fn unopened_count(failures: &[BackendFailure], registry: &BackendRegistry) -> usize {
    failures
        .iter()
        .filter(|f| !registry.backends.iter().any(|(k, _)| *k == f.kind))
        .count()
}

/// Union of per-unit results: classified entities sorted by identifier, edges
/// restricted to entities that made it into the graph.
pub fn merge(
    mut entities: Vec<SourceEntity>,
    edges: Vec<DependencyEdge>,
    failed: &BTreeSet<String>,
) -> ProjectGraph {
    entities.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    for e in &mut entities {
        classify(e);
        if !failed.is_empty() {
            for m in &mut e.methods {
                m.parameter_identifiers.retain(|p| !failed.contains(p));
            }
        }
    }

    let present: BTreeSet<&str> = entities.iter().map(|e| e.identifier.as_str()).collect();
    let mut edges: Vec<_> = edges
        .into_iter()
        .filter(|e| !e.is_self_loop() && present.contains(e.from.as_str()) && present.contains(e.to.as_str()))
        .collect();
    edges.sort();
    edges.dedup();

    let entry_points = entities
        .iter()
        .filter(|e| e.is_entry_point)
        .map(|e| e.identifier.clone())
        .collect();

    ProjectGraph {
        entities,
        edges,
        entry_points,
    }
}

/// Refine, never retract: an HTTP endpoint makes the entity an entry point and,
/// when nothing more specific matched, a controller.
fn classify(entity: &mut SourceEntity) {
    if entity.methods.iter().any(|m| m.is_endpoint()) {
        entity.is_entry_point = true;
        entity.role = entity.role.refine(Role::Controller);
    }
}
