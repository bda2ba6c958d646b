//! Two-phase identifier resolution.
//!
//! Phase 1 enumerates every unit of every active backend and fixes the closed
//! set of known identifiers. Phase 2 only starts once that set is complete: it
//! extracts facts per unit and keeps references that land inside the set.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::backend::{BackendFailure, BackendKind, BackendRegistry, FileFacts, SourceUnit};
use crate::error::AnalysisError;
use crate::model::{DependencyEdge, Diagnostic, DiagnosticKind, Identifier, SourceEntity};

/// A unit that owns its identifier after collision handling.
#[derive(Debug, Clone)]
pub struct Claim {
    pub kind: BackendKind,
    /// Position of the backend in the registry.
    pub backend_index: usize,
    pub unit: SourceUnit,
    pub identifier: Identifier,
}

impl Claim {
    fn label(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.unit.label())
    }
}

/// Several units derived the same identifier; only `kept` contributes to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierCollision {
    pub identifier: Identifier,
    pub kept: String,
    pub dropped: Vec<String>,
}

#[derive(Debug, Default)]
pub struct IdentityPhase {
    /// Owners in canonical order: backend, then relative path, then symbol.
    pub claims: Vec<Claim>,
    pub known: BTreeSet<Identifier>,
    pub collisions: Vec<IdentifierCollision>,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<BackendFailure>,
    /// Units enumerated per backend (after the run-wide cap).
    pub unit_counts: BTreeMap<BackendKind, usize>,
}

#[derive(Debug, Default)]
pub struct ResolutionPhase {
    /// Sorted by identifier.
    pub entities: Vec<SourceEntity>,
    /// Sorted and deduplicated.
    pub edges: Vec<DependencyEdge>,
    pub diagnostics: Vec<Diagnostic>,
    /// Known identifiers whose extraction failed.
    pub failed: BTreeSet<Identifier>,
}

// ---------------------------------------------------------------------------
// Phase 1
// ---------------------------------------------------------------------------

/// Enumerate and identify every unit; `max_files` caps the whole run.
pub fn collect_identities(registry: &BackendRegistry, max_files: usize) -> IdentityPhase {
    let mut phase = IdentityPhase::default();
    let mut taken = 0usize;
    let mut candidates: Vec<Claim> = Vec::new();

    for (backend_index, (kind, backend)) in registry.backends.iter().enumerate() {
        let discovery = match backend.discover_units() {
            Ok(d) => d,
            Err(error) => {
                tracing::warn!("{} discovery failed: {error}", kind.as_str());
                phase.failures.push(BackendFailure { kind: *kind, error });
                continue;
            }
        };
        phase.diagnostics.extend(discovery.diagnostics);

        let mut units = discovery.units;
        units.sort();
        let room = max_files.saturating_sub(taken);
        if units.len() > room {
            for u in units.split_off(room) {
                phase.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::FileLimitReached,
                        kind.as_str(),
                        format!("run-wide cap of {max_files} units reached"),
                    )
                    .at(u.label()),
                );
            }
        }
        taken += units.len();
        phase.unit_counts.insert(*kind, units.len());

        // ── identify in parallel; order restored by the indexed collect ──
        let identified: Vec<Option<Identifier>> = units
            .par_iter()
            .map(|u| backend.derive_identifier(u))
            .collect();

        for (unit, identifier) in units.into_iter().zip(identified) {
            match identifier {
                Some(identifier) => candidates.push(Claim {
                    kind: *kind,
                    backend_index,
                    unit,
                    identifier,
                }),
                None => tracing::debug!("{}: no identifier for {}", kind.as_str(), unit.label()),
            }
        }
        tracing::debug!("{}: {} units enumerated", kind.as_str(), phase.unit_counts[kind]);
    }

    // ── collision policy: first claimant in canonical order keeps the identifier ──
    let mut owner_of: BTreeMap<Identifier, usize> = BTreeMap::new();
    let mut dropped: BTreeMap<Identifier, Vec<String>> = BTreeMap::new();
    for claim in candidates {
        if owner_of.contains_key(&claim.identifier) {
            dropped.entry(claim.identifier.clone()).or_default().push(claim.label());
            continue;
        }
        owner_of.insert(claim.identifier.clone(), phase.claims.len());
        phase.claims.push(claim);
    }

    for (identifier, losers) in dropped {
        let owner = &phase.claims[owner_of[&identifier]];
        let kept = owner.label();
        tracing::warn!("identifier collision on {identifier}: kept {kept}, dropped {}", losers.join(", "));
        phase.diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::IdentifierCollision,
                owner.kind.as_str(),
                format!("{identifier} also derived by {}", losers.join(", ")),
            )
            .at(owner.unit.rel_path.clone()),
        );
        phase.collisions.push(IdentifierCollision {
            identifier,
            kept,
            dropped: losers,
        });
    }

    phase.known = owner_of.into_keys().collect();
    phase
}

// ---------------------------------------------------------------------------
// Phase 2
// ---------------------------------------------------------------------------

enum UnitOutcome {
    Resolved(SourceEntity, Vec<DependencyEdge>),
    Failed(Identifier, Diagnostic),
}

/// Extract and resolve every claimed unit against the closed identifier set.
///
/// Takes the finished [`IdentityPhase`] by reference, so no unit can be resolved
/// before every identifier is known.
pub fn resolve_units(registry: &BackendRegistry, identities: &IdentityPhase) -> ResolutionPhase {
    let known = &identities.known;

    let outcomes: Vec<UnitOutcome> = identities
        .claims
        .par_iter()
        .filter_map(|claim| {
            let (_, backend) = registry.backends.get(claim.backend_index)?;
            let backend_name = claim.kind.as_str();
            Some(match backend.extract(&claim.unit) {
                Ok(facts) => {
                    let (entity, edges) = resolve_facts(
                        &claim.identifier,
                        backend_name,
                        &claim.unit.rel_path,
                        facts,
                        known,
                    );
                    UnitOutcome::Resolved(entity, edges)
                }
                Err(err) => {
                    tracing::debug!("{backend_name}: extraction failed for {}: {err}", claim.unit.label());
                    UnitOutcome::Failed(
                        claim.identifier.clone(),
                        Diagnostic::new(failure_kind(&err), backend_name, err.to_string())
                            .at(claim.unit.rel_path.clone()),
                    )
                }
            })
        })
        .collect();

    // ── single-threaded reduction ──
    let mut phase = ResolutionPhase::default();
    let mut edges: BTreeSet<DependencyEdge> = BTreeSet::new();
    for outcome in outcomes {
        match outcome {
            UnitOutcome::Resolved(entity, unit_edges) => {
                phase.entities.push(entity);
                edges.extend(unit_edges);
            }
            UnitOutcome::Failed(identifier, diagnostic) => {
                phase.failed.insert(identifier);
                phase.diagnostics.push(diagnostic);
            }
        }
    }

    phase.entities.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    phase.edges = edges.into_iter().collect();
    phase
}

fn failure_kind(err: &AnalysisError) -> DiagnosticKind {
    match err {
        AnalysisError::FileTooLarge { .. } => DiagnosticKind::FileTooLarge,
        AnalysisError::Io(_) => DiagnosticKind::ReadFailure,
        _ => DiagnosticKind::ParseFailure,
    }
}

/// Turn one unit's raw facts into an entity plus edges that stay inside `known`.
///
/// Parameter references resolve to their first known candidate; each one yields
/// a method-scoped edge in addition to the file-level one.
pub fn resolve_facts(
    identifier: &str,
    language: &str,
    source_file: &str,
    facts: FileFacts,
    known: &BTreeSet<Identifier>,
) -> (SourceEntity, Vec<DependencyEdge>) {
    let FileFacts {
        role,
        is_entry_point,
        mut methods,
        raw_references,
        mut parameter_references,
        ..
    } = facts;

    let mut edges: BTreeSet<DependencyEdge> = raw_references
        .iter()
        .filter(|r| known.contains(*r) && r.as_str() != identifier)
        .map(|r| DependencyEdge::file_level(identifier, r.as_str()))
        .collect();

    parameter_references.sort_by_key(|p| (p.method_index, p.position));
    for p in &parameter_references {
        let Some(target) = p.candidates.iter().find(|c| known.contains(*c)) else {
            continue;
        };
        let Some(method) = methods.get_mut(p.method_index) else {
            continue;
        };
        if !method.parameter_identifiers.contains(target) {
            method.parameter_identifiers.push(target.clone());
        }
        if target != identifier {
            edges.insert(DependencyEdge::file_level(identifier, target.as_str()));
            edges.insert(DependencyEdge::parameter(identifier, target.as_str(), method.name.clone(), p.position));
        }
    }

    let entity = SourceEntity {
        identifier: identifier.to_string(),
        source_file: source_file.to_string(),
        role,
        is_entry_point,
        language: language.to_string(),
        methods,
    };
    (entity, edges.into_iter().collect())
}
