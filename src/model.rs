use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Project-unique name of a source entity (qualified type name or module path).
pub type Identifier = String;

/// Architectural role of an entity. Exactly one per entity; `Other` when no rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Controller,
    Service,
    Repository,
    Entity,
    Dto,
    Configuration,
    Listener,
    Utility,
    Exception,
    #[default]
    Other,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Controller => "CONTROLLER",
            Role::Service => "SERVICE",
            Role::Repository => "REPOSITORY",
            Role::Entity => "ENTITY",
            Role::Dto => "DTO",
            Role::Configuration => "CONFIGURATION",
            Role::Listener => "LISTENER",
            Role::Utility => "UTILITY",
            Role::Exception => "EXCEPTION",
            Role::Other => "OTHER",
        }
    }

    pub fn is_other(self) -> bool {
        self == Role::Other
    }

    /// Refinement never retracts: a specialised role is kept, `Other` is replaced.
    pub fn refine(self, candidate: Role) -> Role {
        if self.is_other() {
            candidate
        } else {
            self
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    All,
}

impl HttpMethod {
    /// Case-insensitive verb token (`get`, `GET`, `Get`).
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "ALL" => Some(Self::All),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::All => "ALL",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verb and path travel together so a descriptor can never carry only one of them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpRoute {
    pub method: HttpMethod,
    pub path: String,
}

impl HttpRoute {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// Join a route prefix and a path into one absolute path without empty segments.
///
/// `("users", ":id")` -> `/users/:id`; two empty inputs give `/`.
pub fn join_route(prefix: &str, path: &str) -> String {
    let segs: Vec<&str> = prefix
        .split('/')
        .chain(path.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segs.join("/"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDescriptor {
    pub name: String,
    /// 1-based line of the declaration.
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<HttpMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,
    pub parameter_identifiers: Vec<Identifier>,
    pub declared_exceptions: Vec<String>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            line,
            http_method: None,
            http_path: None,
            parameter_identifiers: vec![],
            declared_exceptions: vec![],
        }
    }

    pub fn with_route(mut self, route: Option<HttpRoute>) -> Self {
        self.set_route(route);
        self
    }

    pub fn set_route(&mut self, route: Option<HttpRoute>) {
        match route {
            Some(r) => {
                self.http_method = Some(r.method);
                self.http_path = Some(r.path);
            }
            None => {
                self.http_method = None;
                self.http_path = None;
            }
        }
    }

    pub fn route(&self) -> Option<HttpRoute> {
        match (self.http_method, self.http_path.as_ref()) {
            (Some(method), Some(path)) => Some(HttpRoute::new(method, path.clone())),
            _ => None,
        }
    }

    pub fn is_endpoint(&self) -> bool {
        self.route().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntity {
    pub identifier: Identifier,
    pub source_file: String,
    pub role: Role,
    pub is_entry_point: bool,
    /// Backend that produced the entity (`java`, `script`, `go`).
    pub language: String,
    pub methods: Vec<MethodDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub from: Identifier,
    pub to: Identifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_position: Option<usize>,
}

impl DependencyEdge {
    pub fn file_level(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            method: None,
            parameter_position: None,
        }
    }

    pub fn parameter(
        from: impl Into<String>,
        to: impl Into<String>,
        method: impl Into<String>,
        position: usize,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            method: Some(method.into()),
            parameter_position: Some(position),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

/// Framework detected for the scripting backend; derived once per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameworkInfo {
    pub name: String,
    pub conventional_source_root: String,
    pub features: BTreeSet<String>,
}

impl FrameworkInfo {
    pub fn has(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// Unified graph handed to the storage sink and the enrichment orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGraph {
    pub entities: Vec<SourceEntity>,
    pub edges: Vec<DependencyEdge>,
    pub entry_points: Vec<Identifier>,
}

impl ProjectGraph {
    pub fn entity(&self, identifier: &str) -> Option<&SourceEntity> {
        self.entities
            .binary_search_by(|e| e.identifier.as_str().cmp(identifier))
            .ok()
            .map(|idx| &self.entities[idx])
    }

    pub fn identifiers(&self) -> BTreeSet<&str> {
        self.entities.iter().map(|e| e.identifier.as_str()).collect()
    }

    pub fn edges_from<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a DependencyEdge> + 'a {
        self.edges.iter().filter(move |e| e.from == identifier)
    }

    pub fn role_counts(&self) -> BTreeMap<Role, usize> {
        let mut out = BTreeMap::new();
        for e in &self.entities {
            *out.entry(e.role).or_insert(0) += 1;
        }
        out
    }

    /// Stable content hash; equal graphs hash equal across runs.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        format!("{:016x}", xxhash_rust::xxh3::xxh3_64(&bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    FileTooLarge,
    FileLimitReached,
    ReadFailure,
    ParseFailure,
    MissingSourceRoot,
    ExcludedDirectory,
    BackendFailed,
    IdentifierCollision,
}

/// Non-fatal condition surfaced alongside the graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, backend: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            backend: backend.to_string(),
            path: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_sets_both_fields_or_neither() {
        let mut m = MethodDescriptor::new("find", 3)
            .with_route(Some(HttpRoute::new(HttpMethod::Get, "/users")));
        assert_eq!(m.http_method, Some(HttpMethod::Get));
        assert_eq!(m.http_path.as_deref(), Some("/users"));

        m.set_route(None);
        assert!(m.http_method.is_none() && m.http_path.is_none());
    }

    #[test]
    fn routes_join_without_empty_segments() {
        assert_eq!(join_route("", ""), "/");
        assert_eq!(join_route("/api/", "/users/{id}"), "/api/users/{id}");
        assert_eq!(join_route("users", ""), "/users");
    }

    #[test]
    fn refine_never_retracts() {
        assert_eq!(Role::Other.refine(Role::Controller), Role::Controller);
        assert_eq!(Role::Service.refine(Role::Controller), Role::Service);
    }

    #[test]
    fn serialises_in_wire_shape() {
        let m = MethodDescriptor::new("get", 7)
            .with_route(Some(HttpRoute::new(HttpMethod::Get, "/a")));
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["httpMethod"], "GET");
        assert_eq!(v["httpPath"], "/a");
        assert!(v.get("parameterIdentifiers").is_some());

        let plain = serde_json::to_value(MethodDescriptor::new("x", 1)).unwrap();
        assert!(plain.get("httpMethod").is_none());
        assert!(plain.get("httpPath").is_none());

        assert_eq!(serde_json::to_value(Role::Dto).unwrap(), "DTO");
    }
}
