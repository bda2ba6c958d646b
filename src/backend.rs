//! The capability set every language backend implements, and the registry that
//! selects backends for a project.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::model::{Diagnostic, Identifier, MethodDescriptor, Role};

/// One analysable thing a backend enumerates: usually a file, for Go a type declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceUnit {
    /// Relative to the project root, `/`-separated. First sort key.
    pub rel_path: String,
    /// Distinguishes several entities declared in one file.
    pub symbol: Option<String>,
    pub path: PathBuf,
    pub source_root: PathBuf,
}

impl SourceUnit {
    pub fn file(path: PathBuf, rel_path: String, source_root: PathBuf) -> Self {
        Self {
            rel_path,
            symbol: None,
            path,
            source_root,
        }
    }

    pub fn label(&self) -> String {
        match &self.symbol {
            Some(sym) => format!("{}#{}", self.rel_path, sym),
            None => self.rel_path.clone(),
        }
    }
}

/// Raw import binding as written in the source; resolved centrally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ImportBinding {
    pub imported: String,
    pub local: String,
    pub source: String,
}

/// Ordered candidates for one method parameter; the first known candidate wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterReference {
    /// Index into `FileFacts::methods`.
    pub method_index: usize,
    /// 0-based parameter position.
    pub position: usize,
    pub candidates: Vec<String>,
}

/// Everything one backend knows about one unit before resolution.
#[derive(Debug, Clone, Default)]
pub struct FileFacts {
    pub role: Role,
    pub is_entry_point: bool,
    pub methods: Vec<MethodDescriptor>,
    pub imports: Vec<ImportBinding>,
    /// Unfiltered candidate identifiers; filtered by the resolver.
    pub raw_references: BTreeSet<String>,
    pub parameter_references: Vec<ParameterReference>,
}

impl FileFacts {
    /// `method name -> candidate identifiers`, in declaration order per method.
    pub fn parameter_candidates_by_method(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for p in &self.parameter_references {
            let Some(m) = self.methods.get(p.method_index) else { continue };
            out.entry(m.name.clone())
                .or_default()
                .extend(p.candidates.iter().cloned());
        }
        out
    }
}

/// Result of `discover_units`.
#[derive(Debug, Default)]
pub struct Discovery {
    pub units: Vec<SourceUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

pub trait LanguageBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deterministic: equal trees yield equal sequences.
    fn discover_units(&self) -> Result<Discovery>;

    /// Pure function of the unit's location.
    fn derive_identifier(&self, unit: &SourceUnit) -> Option<Identifier>;

    /// One pass over the unit producing every per-file fact.
    fn extract(&self, unit: &SourceUnit) -> Result<FileFacts>;

    fn classify_role(&self, unit: &SourceUnit) -> Role {
        self.extract(unit).map(|f| f.role).unwrap_or_default()
    }

    fn is_entry_point(&self, unit: &SourceUnit) -> bool {
        self.extract(unit).map(|f| f.is_entry_point).unwrap_or(false)
    }

    fn extract_methods(&self, unit: &SourceUnit) -> Vec<MethodDescriptor> {
        self.extract(unit).map(|f| f.methods).unwrap_or_default()
    }

    fn extract_raw_references(&self, unit: &SourceUnit) -> BTreeSet<String> {
        self.extract(unit).map(|f| f.raw_references).unwrap_or_default()
    }

    fn extract_parameter_references(&self, unit: &SourceUnit) -> BTreeMap<String, Vec<String>> {
        self.extract(unit)
            .map(|f| f.parameter_candidates_by_method())
            .unwrap_or_default()
    }
}

/// Languages the registry knows, in canonical (collision-priority) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Java,
    Script,
    Go,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Java, BackendKind::Script, BackendKind::Go];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Java => "java",
            BackendKind::Script => "script",
            BackendKind::Go => "go",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

/// A backend that could not be opened; its contribution is discarded whole.
#[derive(Debug)]
pub struct BackendFailure {
    pub kind: BackendKind,
    pub error: crate::error::AnalysisError,
}

#[derive(Default)]
pub struct BackendRegistry {
    pub backends: Vec<(BackendKind, Box<dyn LanguageBackend>)>,
    pub failures: Vec<BackendFailure>,
}

impl BackendRegistry {
    /// Select the backends whose marker files exist under `root`.
    pub fn detect(root: &Path, config: &Config, skip: &[BackendKind]) -> Self {
        let mut reg = Self::default();

        for kind in BackendKind::ALL {
            if skip.contains(&kind) {
                continue;
            }
            match kind {
                BackendKind::Java => {
                    if config.java.enabled && crate::java::JavaBackend::applies(root, config) {
                        reg.push(kind, Box::new(crate::java::JavaBackend::new(root, config)));
                    }
                }
                BackendKind::Script => {
                    if config.script.enabled && crate::script::ScriptBackend::applies(root) {
                        reg.push(kind, Box::new(crate::script::ScriptBackend::new(root, config)));
                    }
                }
                BackendKind::Go => {
                    if config.go.enabled && crate::golang::GoBackend::applies(root, config) {
                        match crate::golang::GoBackend::open(root, config) {
                            Ok(b) => reg.push(kind, Box::new(b)),
                            Err(error) => {
                                tracing::warn!("go backend failed: {error}");
                                reg.failures.push(BackendFailure { kind, error });
                            }
                        }
                    }
                }
            }
        }

        reg
    }

    pub fn push(&mut self, kind: BackendKind, backend: Box<dyn LanguageBackend>) {
        self.backends.push((kind, backend));
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty() && self.failures.is_empty()
    }
}
