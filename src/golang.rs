//! Go backend: reshapes the JSON document printed by an external analyzer.
//!
//! Nothing is scanned here. The analyzer (or a precomputed document) describes
//! every package; each struct and interface becomes one unit, and a package's
//! free functions live on a package-level unit named by the import path.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use crate::backend::{Discovery, FileFacts, LanguageBackend, ParameterReference, SourceUnit};
use crate::config::{Config, GoConfig};
use crate::error::{AnalysisError, Result};
use crate::model::{HttpMethod, HttpRoute, Identifier, MethodDescriptor, Role};
use crate::patterns::{first_match, GO_NAME_SUFFIXES};
use crate::scanner::{normalize_slash, rel_str};

pub const BACKEND_NAME: &str = "go";
pub const MODULE_FILE: &str = "go.mod";

/// Longest stderr excerpt kept in an `AnalyzerExit` error.
const STDERR_EXCERPT_CHARS: usize = 2_000;

const BUILTIN_TYPES: &[&str] = &[
    "bool", "string", "error", "any", "byte", "rune", "int", "int8", "int16", "int32", "int64", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr", "float32", "float64", "complex64", "complex128", "interface{}",
    "struct{}",
];

// ---------------------------------------------------------------------------
// Document schema (unknown fields are ignored)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzerDocument {
    pub module: String,
    pub packages: Vec<GoPackage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoPackage {
    pub path: String,
    pub name: String,
    pub dir: String,
    pub files: Vec<String>,
    pub imports: Vec<String>,
    pub is_entry_point: bool,
    pub structs: Vec<GoStruct>,
    pub interfaces: Vec<GoInterface>,
    pub functions: Vec<GoFunction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoStruct {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub fields: Vec<GoField>,
    pub methods: Vec<String>,
    pub embeds: Vec<String>,
    pub implements: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoInterfaceMethod {
    pub name: String,
    pub params: Vec<GoField>,
    pub returns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoInterface {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub methods: Vec<GoInterfaceMethod>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoFunction {
    pub name: String,
    pub receiver: Option<String>,
    pub file: String,
    pub line: u32,
    pub params: Vec<GoField>,
    pub returns: Vec<String>,
    pub http_method: Option<String>,
    pub http_path: Option<String>,
    pub uses_panic: bool,
}

impl GoFunction {
    fn receiver_type(&self) -> Option<&str> {
        self.receiver
            .as_deref()
            .map(|r| r.trim().trim_start_matches('*'))
            .filter(|r| !r.is_empty())
    }

    /// Both verb and path or nothing.
    fn route(&self) -> Option<HttpRoute> {
        let method = HttpMethod::from_token(self.http_method.as_deref()?)?;
        let path = self.http_path.as_deref()?.trim();
        if path.is_empty() {
            return None;
        }
        Some(HttpRoute::new(method, path))
    }

    fn declared_exceptions(&self) -> Vec<String> {
        let mut out = vec![];
        if self.returns.iter().any(|r| r.trim() == "error") {
            out.push("error".to_string());
        }
        if self.uses_panic {
            out.push("panic".to_string());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Analyzer invocation
// ---------------------------------------------------------------------------

/// Run the analyzer against `root` and return its stdout.
///
/// The child is killed when the timeout fires; a non-zero exit is an error.
pub fn run_analyzer(cfg: &GoConfig, root: &Path) -> Result<Vec<u8>> {
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on(run_analyzer_async(cfg, root))
}

async fn run_analyzer_async(cfg: &GoConfig, root: &Path) -> Result<Vec<u8>> {
    let command_line = std::iter::once(cfg.command.as_str())
        .chain(cfg.args.iter().map(|a| a.as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    let mut cmd = tokio::process::Command::new(&cfg.command);
    cmd.args(&cfg.args);
    if cfg.append_root {
        cmd.arg(root);
    }
    cmd.current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!("running go analyzer: {command_line}");
    let child = cmd.spawn().map_err(|source| AnalysisError::AnalyzerSpawn {
        command: command_line.clone(),
        source,
    })?;

    let output = match tokio::time::timeout(Duration::from_secs(cfg.timeout_secs), child.wait_with_output()).await {
        Ok(res) => res?,
        Err(_) => {
            return Err(AnalysisError::AnalyzerTimeout {
                command: command_line,
                timeout_secs: cfg.timeout_secs,
            })
        }
    };

    if !output.status.success() {
        let stderr: String = String::from_utf8_lossy(&output.stderr)
            .trim()
            .chars()
            .take(STDERR_EXCERPT_CHARS)
            .collect();
        return Err(AnalysisError::AnalyzerExit {
            command: command_line,
            status: output.status.to_string(),
            stderr,
        });
    }
    Ok(output.stdout)
}

pub fn parse_document(bytes: &[u8]) -> Result<AnalyzerDocument> {
    Ok(serde_json::from_slice(bytes)?)
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct GoEntity {
    unit: SourceUnit,
    identifier: Identifier,
    facts: FileFacts,
}

pub struct GoBackend {
    /// Keyed by unit label; a `BTreeMap` keeps lookups independent of document order.
    entities: BTreeMap<String, GoEntity>,
}

impl GoBackend {
    pub fn applies(root: &Path, config: &Config) -> bool {
        root.join(MODULE_FILE).is_file() || config.go.document.is_some()
    }

    /// Load the analyzer document (precomputed or freshly produced) and reshape it.
    pub fn open(root: &Path, config: &Config) -> Result<Self> {
        let bytes = match &config.go.document {
            Some(doc) => std::fs::read(root.join(doc))?,
            None => run_analyzer(&config.go, root)?,
        };
        let doc = parse_document(&bytes)?;
        tracing::debug!("go analyzer reported {} packages for {}", doc.packages.len(), doc.module);
        Ok(Self::from_document(root, &doc))
    }

    pub fn from_document(root: &Path, doc: &AnalyzerDocument) -> Self {
        let mut entities = BTreeMap::new();
        for pkg in &doc.packages {
            for e in reshape_package(root, pkg) {
                entities.entry(e.unit.label()).or_insert(e);
            }
        }
        Self { entities }
    }
}

impl LanguageBackend for GoBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn discover_units(&self) -> Result<Discovery> {
        let mut units: Vec<SourceUnit> = self.entities.values().map(|e| e.unit.clone()).collect();
        units.sort();
        Ok(Discovery {
            units,
            diagnostics: vec![],
        })
    }

    fn derive_identifier(&self, unit: &SourceUnit) -> Option<Identifier> {
        self.entities.get(&unit.label()).map(|e| e.identifier.clone())
    }

    fn extract(&self, unit: &SourceUnit) -> Result<FileFacts> {
        self.entities
            .get(&unit.label())
            .map(|e| e.facts.clone())
            .ok_or_else(|| AnalysisError::parse(&unit.path, "unit not present in analyzer document"))
    }
}

/// Path of a declaring file relative to the project root.
///
/// Bare file names are relative to the package directory; anything else to the module root.
fn unit_rel_path(root: &Path, pkg: &GoPackage, file: &str) -> String {
    let file = file.trim();
    let dir = pkg.dir.trim();
    let joined: PathBuf = if Path::new(file).is_absolute() {
        PathBuf::from(file)
    } else if !file.contains('/') && !dir.is_empty() {
        Path::new(dir).join(file)
    } else {
        PathBuf::from(file)
    };
    if joined.is_absolute() {
        rel_str(root, &joined)
    } else {
        normalize_slash(&joined)
    }
}

fn unit_for(root: &Path, pkg: &GoPackage, file: &str, symbol: Option<&str>) -> SourceUnit {
    let rel_path = unit_rel_path(root, pkg, file);
    SourceUnit {
        path: root.join(&rel_path),
        rel_path,
        symbol: symbol.map(|s| s.to_string()),
        source_root: root.to_path_buf(),
    }
}

/// Every named type a type expression mentions (`map[K][]*pkg.V` -> `K`, `pkg.V`).
fn type_names(expr: &str) -> Vec<String> {
    let mut s = expr.trim();
    loop {
        let before = s;
        for prefix in ["*", "[]", "...", "<-chan ", "chan<- ", "chan "] {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest.trim_start();
            }
        }
        if s.starts_with('[') {
            // fixed-size array `[4]T`
            if let Some(close) = s.find(']') {
                s = s[close + 1..].trim_start();
            }
        }
        if s == before {
            break;
        }
    }
    if s.is_empty() || is_type_literal(s) {
        return vec![];
    }
    if let Some(rest) = s.strip_prefix("map[") {
        let mut depth = 1;
        for (idx, c) in rest.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        let mut out = type_names(&rest[..idx]);
                        out.extend(type_names(&rest[idx + 1..]));
                        return out;
                    }
                }
                _ => {}
            }
        }
        return vec![];
    }
    // Generic instantiation `Page[T]` names `Page`.
    let name = s.split('[').next().unwrap_or(s).trim();
    if name.is_empty() || BUILTIN_TYPES.contains(&name) {
        return vec![];
    }
    vec![name.to_string()]
}

/// `func(...)`, `struct{...}` and `interface{...}` name no type of their own.
fn is_type_literal(s: &str) -> bool {
    ["func", "struct", "interface"].iter().any(|kw| {
        s.strip_prefix(kw)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
    })
}

/// Qualify type names against the package's imports (matched on last path segment).
fn type_candidates(expr: &str, pkg: &GoPackage) -> Vec<String> {
    let mut out = vec![];
    for name in type_names(expr) {
        let candidate = match name.split_once('.') {
            Some((alias, ty)) => match pkg.imports.iter().find(|imp| imp.rsplit('/').next() == Some(alias)) {
                Some(imp) => format!("{imp}.{ty}"),
                None => continue,
            },
            None => format!("{}.{}", pkg.path, name),
        };
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

fn role_for(name: &str) -> Role {
    first_match(GO_NAME_SUFFIXES, |s| name.ends_with(s)).unwrap_or_default()
}

/// Method descriptor for `func`, recording its parameter candidates in `facts`.
fn add_function(facts: &mut FileFacts, pkg: &GoPackage, func: &GoFunction) {
    let mut method = MethodDescriptor::new(func.name.clone(), func.line).with_route(func.route());
    method.declared_exceptions = func.declared_exceptions();
    let method_index = facts.methods.len();
    facts.methods.push(method);
    add_parameters(facts, pkg, method_index, &func.params);
    for r in &func.returns {
        facts.raw_references.extend(type_candidates(r, pkg));
    }
}

fn add_parameters(facts: &mut FileFacts, pkg: &GoPackage, method_index: usize, params: &[GoField]) {
    for (position, p) in params.iter().enumerate() {
        let candidates = type_candidates(&p.ty, pkg);
        if candidates.is_empty() {
            continue;
        }
        facts.raw_references.extend(candidates.iter().cloned());
        facts.parameter_references.push(ParameterReference {
            method_index,
            position,
            candidates,
        });
    }
}

fn finalize_http(facts: &mut FileFacts) {
    if facts.methods.iter().any(|m| m.is_endpoint()) {
        facts.is_entry_point = true;
        facts.role = facts.role.refine(Role::Controller);
    }
}

fn reshape_package(root: &Path, pkg: &GoPackage) -> Vec<GoEntity> {
    let mut out = Vec::new();

    for st in &pkg.structs {
        let mut facts = FileFacts {
            role: role_for(&st.name),
            ..Default::default()
        };
        for f in &st.fields {
            facts.raw_references.extend(type_candidates(&f.ty, pkg));
        }
        for t in st.embeds.iter().chain(st.implements.iter()) {
            facts.raw_references.extend(type_candidates(t, pkg));
        }
        let mut seen: Vec<&str> = vec![];
        for func in pkg.functions.iter().filter(|f| f.receiver_type() == Some(st.name.as_str())) {
            add_function(&mut facts, pkg, func);
            seen.push(&func.name);
        }
        for m in st.methods.iter().filter(|m| !seen.contains(&m.as_str())) {
            facts.methods.push(MethodDescriptor::new(m.clone(), st.line));
        }
        finalize_http(&mut facts);
        out.push(GoEntity {
            unit: unit_for(root, pkg, &st.file, Some(&st.name)),
            identifier: format!("{}.{}", pkg.path, st.name),
            facts,
        });
    }

    for iface in &pkg.interfaces {
        let mut facts = FileFacts {
            role: role_for(&iface.name),
            ..Default::default()
        };
        for m in &iface.methods {
            let method_index = facts.methods.len();
            let mut method = MethodDescriptor::new(m.name.clone(), iface.line);
            if m.returns.iter().any(|r| r.trim() == "error") {
                method.declared_exceptions.push("error".to_string());
            }
            facts.methods.push(method);
            add_parameters(&mut facts, pkg, method_index, &m.params);
            for r in &m.returns {
                facts.raw_references.extend(type_candidates(r, pkg));
            }
        }
        out.push(GoEntity {
            unit: unit_for(root, pkg, &iface.file, Some(&iface.name)),
            identifier: format!("{}.{}", pkg.path, iface.name),
            facts,
        });
    }

    // Receivers on named func, slice or map types have no unit of their own.
    let declared = |name: &str| {
        pkg.structs.iter().any(|s| s.name == name) || pkg.interfaces.iter().any(|i| i.name == name)
    };
    let free: Vec<&GoFunction> = pkg
        .functions
        .iter()
        .filter(|f| f.receiver_type().map_or(true, |r| !declared(r)))
        .collect();
    if !free.is_empty() || pkg.is_entry_point {
        let mut facts = FileFacts {
            is_entry_point: pkg.is_entry_point,
            ..Default::default()
        };
        facts.raw_references.extend(pkg.imports.iter().cloned());
        for func in free {
            add_function(&mut facts, pkg, func);
        }
        finalize_http(&mut facts);
        let unit = match pkg.files.first() {
            Some(file) => unit_for(root, pkg, file, None),
            None => {
                let rel_path = pkg.dir.trim().trim_end_matches('/').to_string();
                SourceUnit::file(root.join(&rel_path), rel_path, root.to_path_buf())
            }
        };
        out.push(GoEntity {
            unit,
            identifier: pkg.path.clone(),
            facts,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = r#"{
  "module": "example.com/shop",
  "go_version": "1.22",
  "packages": [
    {
      "path": "example.com/shop/internal/orders",
      "name": "orders",
      "dir": "internal/orders",
      "files": ["handler.go", "store.go"],
      "imports": ["example.com/shop/internal/models", "net/http"],
      "structs": [
        {
          "name": "OrderHandler",
          "file": "handler.go",
          "line": 12,
          "fields": [{ "name": "store", "type": "*OrderStore" }],
          "methods": ["Create", "Health"]
        },
        {
          "name": "OrderStore",
          "file": "store.go",
          "line": 8,
          "fields": [{ "name": "items", "type": "map[string][]*models.Order" }]
        }
      ],
      "interfaces": [
        {
          "name": "Repository",
          "file": "store.go",
          "line": 3,
          "methods": [
            { "name": "Save", "params": [{ "name": "o", "type": "*models.Order" }], "returns": ["error"] }
          ]
        }
      ],
      "functions": [
        {
          "name": "Create",
          "receiver": "*OrderHandler",
          "file": "handler.go",
          "line": 20,
          "params": [
            { "name": "w", "type": "http.ResponseWriter" },
            { "name": "req", "type": "*models.CreateOrderRequest" }
          ],
          "returns": ["error"],
          "http_method": "POST",
          "http_path": "/orders",
          "uses_panic": true,
          "doc": "Create places an order."
        },
        { "name": "NewOrderStore", "file": "store.go", "line": 30, "returns": ["*OrderStore"] }
      ]
    },
    {
      "path": "example.com/shop/cmd/api",
      "name": "main",
      "dir": "cmd/api",
      "files": ["main.go"],
      "imports": ["example.com/shop/internal/orders"],
      "is_entry_point": true,
      "functions": [{ "name": "main", "file": "main.go", "line": 9 }]
    }
  ]
}"#;

    fn backend() -> GoBackend {
        let doc = parse_document(DOC.as_bytes()).unwrap();
        GoBackend::from_document(Path::new("/repo"), &doc)
    }

    fn entity<'a>(b: &'a GoBackend, identifier: &str) -> &'a GoEntity {
        b.entities.values().find(|e| e.identifier == identifier).unwrap()
    }

    #[test]
    fn structs_interfaces_and_packages_become_units() {
        let b = backend();
        let units = b.discover_units().unwrap().units;
        let ids: Vec<String> = units.iter().map(|u| b.derive_identifier(u).unwrap()).collect();
        assert_eq!(
            ids,
            vec![
                "example.com/shop/cmd/api",
                "example.com/shop/internal/orders",
                "example.com/shop/internal/orders.OrderHandler",
                "example.com/shop/internal/orders.OrderStore",
                "example.com/shop/internal/orders.Repository",
            ]
        );
        assert_eq!(units[1].rel_path, "internal/orders/handler.go");
        assert_eq!(units[2].symbol.as_deref(), Some("OrderHandler"));
    }

    #[test]
    fn receiver_methods_attach_with_http_and_exceptions() {
        let b = backend();
        let h = entity(&b, "example.com/shop/internal/orders.OrderHandler");
        assert_eq!(h.facts.role, Role::Controller);
        assert!(h.facts.is_entry_point);

        let create = &h.facts.methods[0];
        assert_eq!(create.name, "Create");
        assert_eq!(create.line, 20);
        assert_eq!(create.http_method, Some(HttpMethod::Post));
        assert_eq!(create.http_path.as_deref(), Some("/orders"));
        assert_eq!(create.declared_exceptions, vec!["error".to_string(), "panic".to_string()]);

        // Listed in the struct only: kept without HTTP metadata.
        let health = &h.facts.methods[1];
        assert_eq!(health.name, "Health");
        assert!(!health.is_endpoint());

        let req = h.facts.parameter_references.iter().find(|p| p.position == 1).unwrap();
        assert_eq!(req.candidates, vec!["example.com/shop/internal/models.CreateOrderRequest".to_string()]);
        assert!(h
            .facts
            .raw_references
            .contains("example.com/shop/internal/orders.OrderStore"));
    }

    #[test]
    fn package_unit_holds_free_functions_and_entry_flag() {
        let b = backend();
        let main = entity(&b, "example.com/shop/cmd/api");
        assert!(main.facts.is_entry_point);
        assert_eq!(main.facts.methods[0].name, "main");
        assert!(main.facts.raw_references.contains("example.com/shop/internal/orders"));

        let orders = entity(&b, "example.com/shop/internal/orders");
        assert_eq!(orders.facts.methods.len(), 1);
        assert_eq!(orders.facts.methods[0].name, "NewOrderStore");
        assert!(!orders.facts.is_entry_point);
    }

    #[test]
    fn methods_on_undeclared_receiver_types_join_the_package_unit() {
        let doc = parse_document(
            br#"{ "packages": [ {
                "path": "example.com/svc/web", "dir": "web", "files": ["health.go"],
                "functions": [
                    { "name": "ServeHTTP", "receiver": "HandlerFunc", "file": "health.go", "line": 7,
                      "params": [{ "name": "r", "type": "*Probe" }],
                      "http_method": "GET", "http_path": "/health" }
                ],
                "structs": [ { "name": "Probe", "file": "health.go", "line": 3 } ]
            } ] }"#,
        )
        .unwrap();
        let b = GoBackend::from_document(Path::new("/repo"), &doc);
        assert_eq!(b.discover_units().unwrap().units.len(), 2);

        let pkg = entity(&b, "example.com/svc/web");
        assert!(pkg.facts.is_entry_point);
        assert_eq!(pkg.facts.role, Role::Controller);
        let serve = &pkg.facts.methods[0];
        assert_eq!(serve.name, "ServeHTTP");
        assert_eq!(serve.http_method, Some(HttpMethod::Get));
        assert_eq!(serve.http_path.as_deref(), Some("/health"));
        assert_eq!(
            pkg.facts.parameter_references[0].candidates,
            vec!["example.com/svc/web.Probe".to_string()]
        );
        assert!(entity(&b, "example.com/svc/web.Probe").facts.methods.is_empty());
    }

    #[test]
    fn interface_roles_and_params() {
        let b = backend();
        let repo = entity(&b, "example.com/shop/internal/orders.Repository");
        assert_eq!(repo.facts.role, Role::Repository);
        assert_eq!(repo.facts.methods[0].declared_exceptions, vec!["error".to_string()]);
        assert_eq!(
            repo.facts.parameter_references[0].candidates,
            vec!["example.com/shop/internal/models.Order".to_string()]
        );
        let store = entity(&b, "example.com/shop/internal/orders.OrderStore");
        assert_eq!(store.facts.role, Role::Repository);
        assert!(store.facts.raw_references.contains("example.com/shop/internal/models.Order"));
    }

    #[test]
    fn type_expressions() {
        assert_eq!(type_names("*pkg.T"), vec!["pkg.T"]);
        assert_eq!(type_names("[]Item"), vec!["Item"]);
        assert_eq!(type_names("map[Key][]*v.Val"), vec!["Key", "v.Val"]);
        assert_eq!(type_names("[4]byte"), Vec::<String>::new());
        assert_eq!(type_names("func(int) error"), Vec::<String>::new());
        assert_eq!(type_names("Page[User]"), vec!["Page"]);
        assert_eq!(type_names("functionResult"), vec!["functionResult"]);
    }

    #[test]
    fn one_sided_http_metadata_is_dropped() {
        let f = GoFunction {
            name: "X".into(),
            http_method: Some("GET".into()),
            ..Default::default()
        };
        assert!(f.route().is_none());
    }

    #[test]
    fn malformed_document_is_an_output_error() {
        let err = parse_document(b"{ \"packages\": 3 }").unwrap_err();
        assert!(matches!(err, AnalysisError::AnalyzerOutput(_)));
        assert!(!err.is_file_level());
    }

    fn sh(script: &str, timeout_secs: u64) -> GoConfig {
        GoConfig {
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            append_root: false,
            timeout_secs,
            ..Default::default()
        }
    }

    #[test]
    fn analyzer_stdout_is_the_document() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("analysis.json"), DOC).unwrap();
        let out = run_analyzer(&sh("cat analysis.json", 10), tmp.path()).unwrap();
        assert_eq!(parse_document(&out).unwrap().packages.len(), 2);
    }

    #[test]
    fn analyzer_non_zero_exit_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = run_analyzer(&sh("echo broken >&2; exit 3", 10), tmp.path()).unwrap_err();
        match err {
            AnalysisError::AnalyzerExit { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn analyzer_timeout_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = run_analyzer(&sh("sleep 5", 1), tmp.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::AnalyzerTimeout { timeout_secs: 1, .. }));
    }

    #[test]
    fn missing_analyzer_fails_to_spawn() {
        let tmp = TempDir::new().unwrap();
        let cfg = GoConfig {
            command: "definitely-not-a-real-go-analyzer".into(),
            ..Default::default()
        };
        let err = run_analyzer(&cfg, tmp.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::AnalyzerSpawn { .. }));
    }

    #[test]
    fn precomputed_document_is_used_without_running() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("go-analysis.json"), DOC).unwrap();
        let mut cfg = Config::default();
        cfg.go.command = "definitely-not-a-real-go-analyzer".into();
        cfg.go.document = Some(PathBuf::from("go-analysis.json"));
        assert!(GoBackend::applies(tmp.path(), &cfg));
        let b = GoBackend::open(tmp.path(), &cfg).unwrap();
        assert_eq!(b.discover_units().unwrap().units.len(), 5);
    }
}
