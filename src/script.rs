//! TypeScript / JavaScript backend built on tree-sitter.
//!
//! The framework is detected once per project; every file is then walked with
//! the same [`FrameworkInfo`], which decides whether decorators, file
//! conventions or router calls produce HTTP endpoints.

use std::path::{Path, PathBuf};
use tree_sitter::{Language, Node, Parser};

use crate::backend::{Discovery, FileFacts, ImportBinding, LanguageBackend, ParameterReference, SourceUnit};
use crate::config::{Config, LimitsConfig};
use crate::error::{AnalysisError, Result};
use crate::framework::{detect_framework, MANIFEST_FILE};
use crate::model::{
    join_route, Diagnostic, DiagnosticKind, FrameworkInfo, HttpMethod, HttpRoute, Identifier, MethodDescriptor,
    Role,
};
use crate::patterns::{
    first_match, FEATURE_CALL_ROUTING, FEATURE_DECORATOR_ROUTING, FEATURE_FILE_ROUTING, ROUTER_RECEIVERS,
    ROUTER_VERBS, ROUTE_CONVENTION_ROOTS, ROUTE_FILE_STEM, SCRIPT_DECORATOR_ROLES, SCRIPT_ENTRY_CLASS_DECORATORS,
    SCRIPT_ENTRY_FILE_STEMS, SCRIPT_ENTRY_MEMBER_DECORATORS, SCRIPT_EXTENSIONS, SCRIPT_FILENAME_ROLES,
    SCRIPT_ROOT_ENTRY_FILE_STEM, SCRIPT_VERB_DECORATORS,
};
use crate::scanner::{read_source, scan_source_root, ScanOptions, BUILD_OUTPUT_DIRS};

pub const BACKEND_NAME: &str = "script";

pub struct ScriptBackend {
    project_root: PathBuf,
    source_root: PathBuf,
    framework: FrameworkInfo,
    limits: LimitsConfig,
    exclude_dir_names: Vec<String>,
}

impl ScriptBackend {
    pub fn applies(root: &Path) -> bool {
        root.join(MANIFEST_FILE).is_file()
    }

    pub fn new(root: &Path, config: &Config) -> Self {
        let framework = detect_framework(root);
        let source_root = match &config.script.source_root {
            Some(p) => root.join(p),
            None => root.join(&framework.conventional_source_root),
        };
        Self {
            project_root: root.to_path_buf(),
            source_root,
            framework,
            limits: config.limits.clone(),
            exclude_dir_names: config.scan.exclude_dir_names.clone(),
        }
    }

    pub fn framework(&self) -> &FrameworkInfo {
        &self.framework
    }
}

impl LanguageBackend for ScriptBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn discover_units(&self) -> Result<Discovery> {
        let opts = ScanOptions {
            project_root: self.project_root.clone(),
            source_root: self.source_root.clone(),
            extensions: SCRIPT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            reject_suffixes: vec![".d.ts".into(), ".d.mts".into(), ".d.cts".into()],
            max_file_bytes: self.limits.effective_max_file_bytes(),
            max_files: self.limits.max_files,
            build_dirs: BUILD_OUTPUT_DIRS,
            exclude_dir_names: self.exclude_dir_names.clone(),
        };
        let scanned = scan_source_root(&opts, BACKEND_NAME)?;
        let mut out = Discovery {
            units: vec![],
            diagnostics: scanned.diagnostics,
        };
        if !scanned.root_present {
            tracing::warn!("script source root missing: {}", self.source_root.display());
            out.diagnostics.push(Diagnostic::new(
                DiagnosticKind::MissingSourceRoot,
                BACKEND_NAME,
                format!("{} does not exist", self.source_root.display()),
            ));
            return Ok(out);
        }
        out.units = scanned
            .files
            .into_iter()
            .map(|f| SourceUnit::file(f.abs_path, f.rel_path, self.source_root.clone()))
            .collect();
        Ok(out)
    }

    fn derive_identifier(&self, unit: &SourceUnit) -> Option<Identifier> {
        module_identifier(&unit.path, &unit.source_root)
    }

    fn extract(&self, unit: &SourceUnit) -> Result<FileFacts> {
        let source = read_source(&unit.path, self.limits.effective_max_file_bytes())?;
        let identifier = self.derive_identifier(unit).unwrap_or_default();
        let file = ScriptFile {
            rel_path: &unit.rel_path,
            identifier: &identifier,
        };
        analyze_script_source(&source, &file, &self.framework).map_err(|e| match e {
            AnalysisError::Parse { message, .. } => AnalysisError::parse(&unit.path, message),
            other => other,
        })
    }
}

/// `src/users/users.service.ts` under `src` -> `users/users.service`.
pub fn module_identifier(file: &Path, source_root: &Path) -> Option<Identifier> {
    let rel = file.strip_prefix(source_root).ok()?;
    let rel = rel.to_string_lossy().replace('\\', "/");
    let stripped = strip_script_extension(&rel);
    if stripped.is_empty() || stripped == rel {
        return None;
    }
    Some(stripped.to_string())
}

fn strip_script_extension(path: &str) -> &str {
    for ext in SCRIPT_EXTENSIONS {
        if let Some(base) = path.strip_suffix(ext).and_then(|b| b.strip_suffix('.')) {
            return base;
        }
    }
    path
}

/// Identifier candidates for an import specifier written in module `importer`.
///
/// Relative specifiers are joined to the importer's directory, `@/` and `~/`
/// are rooted at the source root, bare specifiers are kept. Every candidate
/// also has an `/index` variant.
pub fn module_candidates(specifier: &str, importer: &str) -> Vec<String> {
    let spec = specifier.trim();
    let base = if spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../") {
        let dir = importer.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        match join_module_path(dir, spec) {
            Some(p) => p,
            None => return vec![],
        }
    } else if let Some(rest) = spec.strip_prefix("@/").or_else(|| spec.strip_prefix("~/")) {
        match join_module_path("", rest) {
            Some(p) => p,
            None => return vec![],
        }
    } else {
        spec.to_string()
    };
    let base = strip_script_extension(&base).trim_end_matches('/').to_string();
    if base.is_empty() {
        return vec!["index".to_string()];
    }
    let index = format!("{base}/index");
    vec![base, index]
}

/// `None` when the path climbs above the source root.
fn join_module_path(dir: &str, rel: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in rel.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

/// File-convention route path for `app/.../route.ts`, or `None` for other files.
pub fn convention_route_path(rel_path: &str) -> Option<String> {
    let (dir, file) = rel_path.rsplit_once('/')?;
    let stem = file.split('.').next()?;
    if stem != ROUTE_FILE_STEM {
        return None;
    }
    let root = ROUTE_CONVENTION_ROOTS
        .iter()
        .find(|r| dir == **r || dir.starts_with(&format!("{r}/")))?;
    let rest = dir[root.len()..].trim_start_matches('/');

    let segments: Vec<String> = rest
        .split('/')
        .filter(|s| !s.is_empty())
        .filter(|s| !(s.starts_with('(') && s.ends_with(')')) && !s.starts_with('@'))
        .map(|s| {
            if let Some(name) = s.strip_prefix("[[...").and_then(|r| r.strip_suffix("]]")) {
                format!(":{name}*")
            } else if let Some(name) = s.strip_prefix("[...").and_then(|r| r.strip_suffix(']')) {
                format!(":{name}*")
            } else if let Some(name) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
                format!(":{name}")
            } else {
                s.to_string()
            }
        })
        .collect();
    Some(format!("/{}", segments.join("/")))
}

fn filename_role(file_stem: &str) -> Option<Role> {
    let segments: Vec<String> = file_stem
        .split(['.', '-', '_'])
        .map(|s| s.to_ascii_lowercase())
        .collect();
    first_match(SCRIPT_FILENAME_ROLES, |m| segments.iter().any(|s| s == m))
}

fn is_entry_filename(file_stem: &str, at_top_level: bool) -> bool {
    SCRIPT_ENTRY_FILE_STEMS.contains(&file_stem) || (at_top_level && file_stem == SCRIPT_ROOT_ENTRY_FILE_STEM)
}

/// Return true when a source text looks minified or machine-generated.
///
/// Inspects the first 5 non-empty lines; a single line over 2 000 chars is
/// enough. Parsing such bundles is slow and yields nothing useful.
pub fn is_minified_or_generated(source_text: &str) -> bool {
    const MAX_SAFE_LINE_CHARS: usize = 2_000;
    source_text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(5)
        .any(|l| l.len() > MAX_SAFE_LINE_CHARS)
}

fn language_for(rel_path: &str) -> Language {
    let ext = rel_path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "tsx" => tree_sitter_typescript::LANGUAGE_TSX.into(),
        "ts" | "mts" | "cts" => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        _ => tree_sitter_javascript::LANGUAGE.into(),
    }
}

/// Location facts a file's analysis needs besides its text.
pub struct ScriptFile<'a> {
    /// Relative to the project root.
    pub rel_path: &'a str,
    /// Module identifier under the effective source root.
    pub identifier: &'a str,
}

pub fn analyze_script_source(source: &str, file: &ScriptFile<'_>, framework: &FrameworkInfo) -> Result<FileFacts> {
    if is_minified_or_generated(source) {
        return Err(AnalysisError::parse(file.rel_path, "minified or generated source"));
    }

    let mut parser = Parser::new();
    parser
        .set_language(&language_for(file.rel_path))
        .map_err(|e| AnalysisError::parse(file.rel_path, e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| AnalysisError::parse(file.rel_path, "parser returned no tree"))?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(AnalysisError::parse(file.rel_path, "syntax error"));
    }

    let file_name = file.rel_path.rsplit('/').next().unwrap_or(file.rel_path);
    let file_stem = strip_script_extension(file_name);
    let mut walker = Walker {
        src: source,
        identifier: file.identifier,
        framework,
        route_path: if framework.has(FEATURE_FILE_ROUTING) {
            convention_route_path(file.rel_path)
        } else {
            None
        },
        facts: FileFacts::default(),
        decorator_role: None,
        entry: false,
        call_routes: false,
        param_types: vec![],
        clause_routes: vec![],
    };
    walker.visit(root, false);
    let mut facts = walker.finish();

    if facts.role.is_other() {
        facts.role = filename_role(file_stem).unwrap_or_default();
    }
    let at_top_level = !file.identifier.contains('/');
    if is_entry_filename(file_stem, at_top_level) {
        facts.is_entry_point = true;
    }
    Ok(facts)
}

// ---------------------------------------------------------------------------
// Tree walk
// ---------------------------------------------------------------------------

struct Walker<'a> {
    src: &'a str,
    identifier: &'a str,
    framework: &'a FrameworkInfo,
    /// Set for file-convention route handlers.
    route_path: Option<String>,
    facts: FileFacts,
    decorator_role: Option<Role>,
    entry: bool,
    call_routes: bool,
    /// (method index, position, local type name) awaiting import resolution.
    param_types: Vec<(usize, usize, String)>,
    /// `export { local as GET }` in a route file: (local name, route, line).
    clause_routes: Vec<(Option<String>, HttpRoute, u32)>,
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn is_function_kind(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function"
            | "function_expression"
            | "function"
            | "function_declaration"
            | "generator_function_declaration"
            | "generator_function"
            | "method_definition"
    )
}

fn call_arguments(node: Node<'_>) -> Vec<Node<'_>> {
    node.child_by_field_name("arguments")
        .map(|args| {
            named_children(args)
                .into_iter()
                .filter(|n| n.kind() != "comment")
                .collect()
        })
        .unwrap_or_default()
}

fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

impl<'a> Walker<'a> {
    fn text(&self, node: Node<'_>) -> &'a str {
        self.src.get(node.byte_range()).unwrap_or("")
    }

    fn string_literal(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "string" => {
                let raw = self.text(node).trim();
                let inner = raw.get(1..raw.len().saturating_sub(1))?;
                Some(inner.to_string())
            }
            "template_string" => {
                if named_children(node).iter().any(|c| c.kind() == "template_substitution") {
                    return None;
                }
                let raw = self.text(node).trim();
                Some(raw.trim_matches('`').to_string())
            }
            _ => None,
        }
    }

    fn visit(&mut self, node: Node<'_>, in_function: bool) {
        match node.kind() {
            "import_statement" => {
                self.import_statement(node);
                return;
            }
            "export_statement" => {
                self.export_statement(node, in_function);
                return;
            }
            "class_declaration" | "abstract_class_declaration" if !in_function => {
                self.class(node, None);
                return;
            }
            "function_declaration" | "generator_function_declaration" if !in_function => {
                self.function_declaration(node, false);
                return;
            }
            "lexical_declaration" | "variable_declaration" => {
                self.variable_declaration(node, in_function, false);
                return;
            }
            "expression_statement" if !in_function => {
                if self.module_exports_assignment(node) {
                    return;
                }
            }
            "call_expression" => self.call(node),
            _ => {}
        }

        let inner = in_function || is_function_kind(node.kind());
        for child in named_children(node) {
            self.visit(child, inner);
        }
    }

    fn reference(&mut self, specifier: &str) {
        for c in module_candidates(specifier, self.identifier) {
            self.facts.raw_references.insert(c);
        }
    }

    fn bind(&mut self, imported: &str, local: &str, source: &str) {
        self.facts.imports.push(ImportBinding {
            imported: imported.to_string(),
            local: local.to_string(),
            source: source.to_string(),
        });
    }

    fn import_statement(&mut self, node: Node<'_>) {
        let Some(spec) = node.child_by_field_name("source").and_then(|s| self.string_literal(s)) else {
            return;
        };
        self.reference(&spec);

        for child in named_children(node) {
            if child.kind() != "import_clause" {
                continue;
            }
            for part in named_children(child) {
                match part.kind() {
                    "identifier" => {
                        let local = self.text(part);
                        self.bind("default", local, &spec);
                    }
                    "namespace_import" => {
                        if let Some(id) = named_children(part).into_iter().find(|n| n.kind() == "identifier") {
                            let local = self.text(id);
                            self.bind("*", local, &spec);
                        }
                    }
                    "named_imports" => {
                        for s in named_children(part) {
                            if s.kind() != "import_specifier" {
                                continue;
                            }
                            let Some(name) = s.child_by_field_name("name") else { continue };
                            let imported = self.text(name);
                            let local = s.child_by_field_name("alias").map(|a| self.text(a)).unwrap_or(imported);
                            self.bind(imported, local, &spec);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn export_statement(&mut self, node: Node<'_>, in_function: bool) {
        let source = node.child_by_field_name("source").and_then(|s| self.string_literal(s));
        if let Some(spec) = &source {
            self.reference(spec);
        }
        for clause in named_children(node).into_iter().filter(|c| c.kind() == "export_clause") {
            self.export_clause(clause, source.is_some());
        }
        if let Some(decl) = node.child_by_field_name("declaration") {
            match decl.kind() {
                "class_declaration" | "abstract_class_declaration" => self.class(decl, Some(node)),
                "function_declaration" | "generator_function_declaration" => self.function_declaration(decl, true),
                "lexical_declaration" | "variable_declaration" => {
                    self.variable_declaration(decl, in_function, true)
                }
                _ => self.visit(decl, in_function),
            }
        }
        if let Some(value) = node.child_by_field_name("value") {
            match value.kind() {
                "arrow_function" | "function_expression" | "function" => {
                    self.function_value("default", value, value, true);
                }
                "object" => self.object_methods(value),
                "class" => self.class(value, Some(node)),
                _ => self.visit(value, in_function),
            }
        }
    }

    fn export_clause(&mut self, clause: Node<'_>, re_export: bool) {
        for spec in named_children(clause) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let Some(name) = spec.child_by_field_name("name") else { continue };
            let local = self.text(name).to_string();
            let exported = spec.child_by_field_name("alias").map(|a| self.text(a)).unwrap_or(&local);
            let Some(route) = self.convention_route(exported, true) else { continue };
            let local = (!re_export).then_some(local);
            self.clause_routes.push((local, route, line_of(spec)));
        }
    }

    // -- classes ------------------------------------------------------------

    fn decorator_name_and_args<'t>(&self, node: Node<'t>) -> Option<(String, Vec<Node<'t>>)> {
        for child in named_children(node) {
            if child.kind() == "call_expression" {
                let target = child.child_by_field_name("function")?;
                let raw = self.text(target);
                let name = raw.rsplit('.').next().unwrap_or(raw).to_string();
                return Some((name, call_arguments(child)));
            }
        }
        let raw = self.text(node).trim_start_matches('@');
        let name = raw.rsplit('.').next().unwrap_or(raw).trim().to_string();
        if name.is_empty() {
            None
        } else {
            Some((name, vec![]))
        }
    }

    fn first_string_arg(&self, args: &[Node<'_>]) -> Option<String> {
        args.iter().find_map(|a| self.string_literal(*a))
    }

    fn class(&mut self, node: Node<'_>, export: Option<Node<'_>>) {
        let mut decorators: Vec<Node<'_>> = vec![];
        if let Some(ex) = export {
            decorators.extend(named_children(ex).into_iter().filter(|c| c.kind() == "decorator"));
        }
        decorators.extend(named_children(node).into_iter().filter(|c| c.kind() == "decorator"));
        let parsed: Vec<(String, Vec<Node<'_>>)> =
            decorators.iter().filter_map(|d| self.decorator_name_and_args(*d)).collect();

        if self.decorator_role.is_none() {
            self.decorator_role = first_match(SCRIPT_DECORATOR_ROLES, |m| parsed.iter().any(|(n, _)| n == m));
        }
        if parsed.iter().any(|(n, _)| SCRIPT_ENTRY_CLASS_DECORATORS.contains(&n.as_str())) {
            self.entry = true;
        }

        let routing = self.framework.has(FEATURE_DECORATOR_ROUTING);
        let prefix = if routing {
            parsed
                .iter()
                .find(|(n, _)| n == "Controller")
                .and_then(|(_, args)| self.first_string_arg(args))
                .unwrap_or_default()
        } else {
            String::new()
        };

        if let Some(h) = named_children(node).into_iter().find(|c| c.kind() == "class_heritage") {
            self.visit(h, true);
        }
        let Some(body) = node.child_by_field_name("body") else { return };

        let mut pending: Vec<Node<'_>> = vec![];
        for member in named_children(body) {
            match member.kind() {
                "decorator" => pending.push(member),
                "method_definition" => {
                    let mut decos = std::mem::take(&mut pending);
                    decos.extend(named_children(member).into_iter().filter(|c| c.kind() == "decorator"));
                    self.class_method(member, &decos, routing, &prefix);
                }
                "public_field_definition" | "field_definition" => {
                    pending.clear();
                    let name = member
                        .child_by_field_name("name")
                        .or_else(|| member.child_by_field_name("property"));
                    let value = member.child_by_field_name("value");
                    if let (Some(name), Some(value)) = (name, value) {
                        if matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
                            let n = self.text(name).to_string();
                            self.function_value(&n, name, value, false);
                            continue;
                        }
                        self.visit(value, true);
                    }
                }
                "comment" => {}
                _ => pending.clear(),
            }
        }
    }

    fn class_method(&mut self, node: Node<'_>, decorators: &[Node<'_>], routing: bool, prefix: &str) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = self.text(name_node).to_string();
        let parsed: Vec<(String, Vec<Node<'_>>)> =
            decorators.iter().filter_map(|d| self.decorator_name_and_args(*d)).collect();

        if parsed.iter().any(|(n, _)| SCRIPT_ENTRY_MEMBER_DECORATORS.contains(&n.as_str())) {
            self.entry = true;
        }

        let route = if routing {
            parsed.iter().find_map(|(n, args)| {
                let verb = first_match(SCRIPT_VERB_DECORATORS, |m| m == n)?;
                let path = self.first_string_arg(args).unwrap_or_default();
                Some(HttpRoute::new(verb, join_route(prefix, &path)))
            })
        } else {
            None
        };

        let index = self.push_method(MethodDescriptor::new(name, line_of(name_node)).with_route(route));
        self.parameters(node, index);
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body, true);
        }
    }

    // -- functions ----------------------------------------------------------

    fn push_method(&mut self, method: MethodDescriptor) -> usize {
        self.facts.methods.push(method);
        self.facts.methods.len() - 1
    }

    fn convention_route(&self, name: &str, exported: bool) -> Option<HttpRoute> {
        let path = self.route_path.as_ref()?;
        if !exported {
            return None;
        }
        let verb = HttpMethod::from_token(name).filter(|v| v.as_str() == name)?;
        Some(HttpRoute::new(verb, path.clone()))
    }

    fn function_declaration(&mut self, node: Node<'_>, exported: bool) {
        let Some(name_node) = node.child_by_field_name("name") else { return };
        let name = self.text(name_node).to_string();
        self.function_value(&name, name_node, node, exported);
    }

    /// Record `func` as a method called `name`, then scan its body for calls.
    fn function_value(&mut self, name: &str, anchor: Node<'_>, func: Node<'_>, exported: bool) {
        let route = self.convention_route(name, exported);
        let index = self.push_method(MethodDescriptor::new(name, line_of(anchor)).with_route(route));
        self.parameters(func, index);
        if let Some(body) = func.child_by_field_name("body") {
            self.visit(body, true);
        }
    }

    fn parameters(&mut self, func: Node<'_>, method_index: usize) {
        let Some(params) = func.child_by_field_name("parameters") else { return };
        let list: Vec<Node<'_>> = named_children(params)
            .into_iter()
            .filter(|p| p.kind() != "comment")
            .collect();
        for (position, param) in list.into_iter().enumerate() {
            let ty = param
                .child_by_field_name("type")
                .and_then(|ann| named_children(ann).into_iter().next());
            if let Some(local) = ty.and_then(|t| self.type_head(t)) {
                self.param_types.push((method_index, position, local));
            }
        }
    }

    /// Local name a type annotation refers to (`ns.Dto` -> `ns`, `Repo<User>` -> `Repo`).
    fn type_head(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "type_identifier" | "identifier" => Some(self.text(node).to_string()),
            "generic_type" => self.type_head(node.child_by_field_name("name")?),
            "nested_type_identifier" => {
                let module = node.child_by_field_name("module")?;
                let raw = self.text(module);
                Some(raw.split('.').next().unwrap_or(raw).to_string())
            }
            "array_type" => self.type_head(named_children(node).into_iter().next()?),
            _ => None,
        }
    }

    fn variable_declaration(&mut self, node: Node<'_>, in_function: bool, exported: bool) {
        for decl in named_children(node) {
            if decl.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = decl.child_by_field_name("name") else { continue };
            let Some(value) = decl.child_by_field_name("value") else { continue };

            if value.kind() == "call_expression" && self.require_binding(name_node, value) {
                continue;
            }
            if in_function || name_node.kind() != "identifier" {
                self.visit(value, true);
                continue;
            }

            let name = self.text(name_node).to_string();
            match value.kind() {
                "arrow_function" | "function_expression" | "function" => {
                    self.function_value(&name, name_node, value, exported);
                }
                "call_expression" => {
                    // Wrapper pattern: `const h = withAuth(async (req) => ...)`.
                    let inner = call_arguments(value).into_iter().next().filter(|a| {
                        matches!(a.kind(), "arrow_function" | "function_expression" | "function")
                    });
                    match inner {
                        Some(func) => {
                            self.call(value);
                            self.function_value(&name, name_node, func, exported);
                        }
                        None => self.visit(value, true),
                    }
                }
                "object" => self.object_methods(value),
                _ => self.visit(value, true),
            }
        }
    }

    /// `const x = require('./y')` and `const { a, b: c } = require('./y')`.
    fn require_binding(&mut self, pattern: Node<'_>, call: Node<'_>) -> bool {
        let Some(func) = call.child_by_field_name("function") else { return false };
        if self.text(func) != "require" {
            return false;
        }
        let Some(spec) = call_arguments(call).first().and_then(|a| self.string_literal(*a)) else {
            return false;
        };
        self.reference(&spec);
        match pattern.kind() {
            "identifier" => {
                let local = self.text(pattern);
                self.bind("default", local, &spec);
            }
            "object_pattern" => {
                for p in named_children(pattern) {
                    match p.kind() {
                        "shorthand_property_identifier_pattern" => {
                            let name = self.text(p);
                            self.bind(name, name, &spec);
                        }
                        "pair_pattern" => {
                            let key = p.child_by_field_name("key").map(|k| self.text(k));
                            let value = p.child_by_field_name("value").map(|v| self.text(v));
                            if let (Some(k), Some(v)) = (key, value) {
                                self.bind(k, v, &spec);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        true
    }

    /// Methods and function-valued properties of an object literal; never routable.
    fn object_methods(&mut self, node: Node<'_>) {
        for member in named_children(node) {
            match member.kind() {
                "method_definition" => {
                    let Some(name) = member.child_by_field_name("name") else { continue };
                    let n = self.text(name).to_string();
                    let index = self.push_method(MethodDescriptor::new(n, line_of(name)));
                    self.parameters(member, index);
                    if let Some(body) = member.child_by_field_name("body") {
                        self.visit(body, true);
                    }
                }
                "pair" => {
                    let (Some(key), Some(value)) =
                        (member.child_by_field_name("key"), member.child_by_field_name("value"))
                    else {
                        continue;
                    };
                    if matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
                        let n = self.string_literal(key).unwrap_or_else(|| self.text(key).to_string());
                        self.function_value(&n, key, value, false);
                    } else {
                        self.visit(value, true);
                    }
                }
                _ => self.visit(member, true),
            }
        }
    }

    /// `module.exports = {...}` and `exports.name = function () {}`.
    fn module_exports_assignment(&mut self, stmt: Node<'_>) -> bool {
        let Some(assign) = named_children(stmt).into_iter().find(|c| c.kind() == "assignment_expression") else {
            return false;
        };
        let (Some(left), Some(right)) = (assign.child_by_field_name("left"), assign.child_by_field_name("right"))
        else {
            return false;
        };
        let target = self.text(left);
        let name = if target == "module.exports" {
            "default".to_string()
        } else if let Some(n) = target.strip_prefix("exports.").or_else(|| target.strip_prefix("module.exports.")) {
            n.to_string()
        } else {
            return false;
        };
        match right.kind() {
            "object" => self.object_methods(right),
            "arrow_function" | "function_expression" | "function" => self.function_value(&name, left, right, true),
            _ => self.visit(right, true),
        }
        true
    }

    // -- calls --------------------------------------------------------------

    fn call(&mut self, node: Node<'_>) {
        let Some(func) = node.child_by_field_name("function") else { return };
        let args = call_arguments(node);

        if func.kind() == "import" || self.text(func) == "require" {
            if let Some(spec) = args.first().and_then(|a| self.string_literal(*a)) {
                self.reference(&spec);
            }
            return;
        }

        if func.kind() != "member_expression" || !self.framework.has(FEATURE_CALL_ROUTING) {
            return;
        }
        let (Some(object), Some(property)) = (func.child_by_field_name("object"), func.child_by_field_name("property"))
        else {
            return;
        };
        let verb = self.text(property);
        let receiver = self.text(object);
        let head = receiver.split(['.', '(']).next().unwrap_or(receiver).trim();
        if !ROUTER_RECEIVERS.contains(&head) || !ROUTER_VERBS.contains(&verb) {
            return;
        }
        self.call_routes = true;
        self.entry = true;

        let Some(method) = HttpMethod::from_token(verb) else { return };
        // `router.route('/x').get(handler)` carries the path on the inner call.
        let path = args.first().and_then(|a| self.string_literal(*a)).or_else(|| {
            if object.kind() != "call_expression" {
                return None;
            }
            let inner = object.child_by_field_name("function")?;
            let prop = inner.child_by_field_name("property")?;
            if self.text(prop) != "route" {
                return None;
            }
            call_arguments(object).first().and_then(|a| self.string_literal(*a))
        });
        let Some(path) = path else { return };

        let handler = args
            .last()
            .filter(|a| matches!(a.kind(), "identifier" | "member_expression"))
            .map(|a| self.text(*a).to_string())
            .unwrap_or_else(|| format!("{} {}", method, path));
        let route = HttpRoute::new(method, join_route("", &path));
        self.push_method(MethodDescriptor::new(handler, line_of(node)).with_route(Some(route)));
    }

    fn finish(mut self) -> FileFacts {
        for (local, route, line) in std::mem::take(&mut self.clause_routes) {
            let declared = local.as_deref().and_then(|l| {
                self.facts
                    .methods
                    .iter_mut()
                    .find(|m| m.name == l && !m.is_endpoint())
            });
            match declared {
                Some(method) => method.set_route(Some(route)),
                None => {
                    let name = route.method.as_str().to_string();
                    self.push_method(MethodDescriptor::new(name, line).with_route(Some(route)));
                }
            }
        }

        for (method_index, position, local) in std::mem::take(&mut self.param_types) {
            let Some(binding) = self.facts.imports.iter().find(|b| b.local == local) else { continue };
            let candidates = module_candidates(&binding.source, self.identifier);
            if candidates.is_empty() {
                continue;
            }
            self.facts.parameter_references.push(ParameterReference {
                method_index,
                position,
                candidates,
            });
        }

        self.facts.role = self
            .decorator_role
            .or_else(|| self.call_routes.then_some(Role::Controller))
            .unwrap_or_default();
        self.facts.is_entry_point = self.entry;
        self.facts
    }
}
