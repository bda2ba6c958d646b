//! Java backend: brace-depth-aware line scanning, no syntax tree.
//!
//! Works for Spring-style sources: marker annotations classify the declaring
//! type, mapping annotations on members become HTTP endpoints, and imports plus
//! parameter types feed the resolver.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::backend::{Discovery, FileFacts, ImportBinding, LanguageBackend, ParameterReference, SourceUnit};
use crate::config::{Config, LimitsConfig};
use crate::error::Result;
use crate::model::{
    join_route, Diagnostic, DiagnosticKind, HttpMethod, HttpRoute, Identifier, MethodDescriptor, Role,
};
use crate::patterns::{
    first_match, JAVA_ANNOTATION_LOOKBACK, JAVA_ENTRY_MARKERS, JAVA_ENTRY_ROLE_MARKERS, JAVA_GENERIC_MAPPING,
    JAVA_HTTP_MARKERS, JAVA_LISTENER_MARKERS, JAVA_MODIFIERS, JAVA_NAME_SUFFIXES, JAVA_NON_MEMBER_KEYWORDS,
    JAVA_ROLE_MARKERS,
};
use crate::scanner::{read_source, scan_source_root, ScanOptions};

pub const BACKEND_NAME: &str = "java";

/// Longest signature (in lines) collapsed while looking for the body brace.
const MAX_SIGNATURE_LINES: usize = 20;

pub struct JavaBackend {
    project_root: PathBuf,
    source_roots: Vec<PathBuf>,
    limits: LimitsConfig,
    exclude_dir_names: Vec<String>,
}

impl JavaBackend {
    pub fn applies(root: &Path, config: &Config) -> bool {
        ["pom.xml", "build.gradle", "build.gradle.kts"]
            .iter()
            .any(|m| root.join(m).is_file())
            || config.java.source_roots.iter().any(|r| root.join(r).is_dir())
    }

    pub fn new(root: &Path, config: &Config) -> Self {
        Self {
            project_root: root.to_path_buf(),
            source_roots: config.java.source_roots.iter().map(|r| root.join(r)).collect(),
            limits: config.limits.clone(),
            exclude_dir_names: config.scan.exclude_dir_names.clone(),
        }
    }
}

impl LanguageBackend for JavaBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn discover_units(&self) -> Result<Discovery> {
        let mut out = Discovery::default();
        for source_root in &self.source_roots {
            let opts = ScanOptions {
                project_root: self.project_root.clone(),
                source_root: source_root.clone(),
                extensions: vec!["java".into()],
                reject_suffixes: vec!["package-info.java".into(), "module-info.java".into()],
                max_file_bytes: self.limits.effective_max_file_bytes(),
                max_files: self.limits.max_files,
                build_dirs: &[],
                exclude_dir_names: self.exclude_dir_names.clone(),
            };
            let scanned = scan_source_root(&opts, BACKEND_NAME)?;
            if !scanned.root_present {
                tracing::warn!("java source root missing: {}", source_root.display());
                out.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MissingSourceRoot,
                    BACKEND_NAME,
                    format!("{} does not exist", source_root.display()),
                ));
                continue;
            }
            out.diagnostics.extend(scanned.diagnostics);
            out.units.extend(
                scanned
                    .files
                    .into_iter()
                    .map(|f| SourceUnit::file(f.abs_path, f.rel_path, source_root.clone())),
            );
        }
        out.units.sort();
        Ok(out)
    }

    fn derive_identifier(&self, unit: &SourceUnit) -> Option<Identifier> {
        java_identifier(&unit.path, &unit.source_root)
    }

    fn extract(&self, unit: &SourceUnit) -> Result<FileFacts> {
        let source = read_source(&unit.path, self.limits.effective_max_file_bytes())?;
        let identifier = self.derive_identifier(unit).unwrap_or_default();
        Ok(analyze_java_source(&source, &identifier))
    }
}

/// `src/main/java/com/acme/UserController.java` -> `com.acme.UserController`.
pub fn java_identifier(file: &Path, source_root: &Path) -> Option<Identifier> {
    let rel = file.strip_prefix(source_root).ok()?;
    let mut parts: Vec<String> = rel
        .components()
        .filter_map(|c| c.as_os_str().to_str().map(|s| s.to_string()))
        .collect();
    let last = parts.pop()?;
    let stem = last.strip_suffix(".java")?;
    if stem.is_empty() {
        return None;
    }
    parts.push(stem.to_string());
    Some(parts.join("."))
}

// ---------------------------------------------------------------------------
// Regexes
// ---------------------------------------------------------------------------

fn decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(class|interface|enum|record)\s+([A-Za-z_$][\w$]*)").unwrap())
}

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*import\s+(static\s+)?([\w$.]+(?:\.\*)?)\s*;").unwrap())
}

fn member_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:[\w-]+\s+)*?(?:<[^()]*?>\s+)?([\w$.]+(?:\s*<[^()]*>)?(?:\s*\[\s*\])*)\s+([A-Za-z_$][\w$]*)\s*\(")
            .unwrap()
    })
}

fn ctor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:(?:public|protected|private)\s+)?([A-Z][\w$]*)\s*\(").unwrap())
}

fn throws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\)\s*throws\s+([^{;]+)").unwrap())
}

fn extends_throwable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bextends\s+[\w.]*(?:Exception|Error|Throwable)\b").unwrap())
}

fn main_method_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:public\s+static|static\s+public)\s+void\s+main\s*\(").unwrap())
}

fn annotation_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([A-Za-z_][\w$.]*)").unwrap())
}

fn type_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z][A-Za-z0-9_$]*)\b").unwrap())
}

fn qualified_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b((?:[a-z_][a-z0-9_]*\.)+[A-Z][A-Za-z0-9_$]*)").unwrap())
}

fn path_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:value|path)\s*=").unwrap())
}

fn method_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bmethod\s*=\s*\{?\s*(?:RequestMethod\.)?([A-Za-z]+)").unwrap())
}

// ---------------------------------------------------------------------------
// Line model
// ---------------------------------------------------------------------------

struct JavaLine {
    /// Comments removed, string literals intact.
    code: String,
    /// `code` with string/char literal contents blanked.
    bare: String,
}

impl JavaLine {
    fn is_blank(&self) -> bool {
        self.code.trim().is_empty()
    }
}

fn split_lines(source: &str) -> Vec<JavaLine> {
    let mut in_block = false;
    source
        .lines()
        .map(|raw| {
            let code = strip_comments(raw, &mut in_block);
            let bare = blank_strings(&code);
            JavaLine { code, bare }
        })
        .collect()
}

/// Remove `//` and `/* */` comments; block state carries across lines.
fn strip_comments(line: &str, in_block: &mut bool) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        if *in_block {
            if c == '*' && next == Some('/') {
                *in_block = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(n) = next {
                    out.push(n);
                    i += 2;
                    continue;
                }
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match (c, next) {
            ('/', Some('/')) => break,
            ('/', Some('*')) => {
                *in_block = true;
                i += 2;
                continue;
            }
            ('"', _) | ('\'', _) => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }
    out
}

/// Replace string/char literal contents with spaces; byte offsets are preserved.
fn blank_strings(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in code.chars() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                    out.push(c);
                    continue;
                }
                out.extend(std::iter::repeat(' ').take(c.len_utf8()));
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

fn brace_delta(bare: &str) -> i32 {
    bare.chars().fold(0, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    })
}

// ---------------------------------------------------------------------------
// Annotation helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct Annotation {
    /// Last segment of the annotation name (`org.x.Service` -> `Service`).
    name: String,
    args: Option<String>,
}

/// Index of the `)` matching the `(` at `open`, skipping string literals.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse one annotation at the start of `s` (after whitespace). Returns it and the bytes consumed.
fn leading_annotation(s: &str) -> Option<(Annotation, usize)> {
    let trimmed = s.trim_start();
    let offset = s.len() - trimmed.len();
    let rest = trimmed.strip_prefix('@')?;
    let name_len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$' || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let full_name = &rest[..name_len];
    if full_name == "interface" {
        return None;
    }
    let name = full_name.rsplit('.').next().unwrap_or(full_name).to_string();
    let after = &rest[name_len..];
    let after_trim = after.trim_start();
    let mut consumed = offset + 1 + name_len;
    let mut args = None;
    if after_trim.starts_with('(') {
        let open = after.len() - after_trim.len();
        if let Some(close) = matching_paren(after, open) {
            args = Some(after[open + 1..close].to_string());
            consumed += close + 1;
        }
    }
    Some((Annotation { name, args }, consumed))
}

/// Strip leading annotations; returns the annotations and the remainder.
fn split_leading_annotations(s: &str) -> (Vec<Annotation>, &str) {
    let mut out = Vec::new();
    let mut rest = s;
    while let Some((ann, consumed)) = leading_annotation(rest) {
        out.push(ann);
        rest = &rest[consumed..];
    }
    (out, rest)
}

/// Every annotation appearing in `text`, in source order.
fn annotations_in(text: &str) -> Vec<Annotation> {
    let mut out = Vec::new();
    let bare = blank_strings(text);
    for m in annotation_name_re().find_iter(&bare) {
        if let Some((ann, _)) = leading_annotation(&text[m.start()..]) {
            out.push(ann);
        }
    }
    out
}

fn first_string_literal(s: &str) -> Option<String> {
    let start = s.find('"')?;
    let rest = &s[start + 1..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// Path argument of a mapping annotation: `("/x")`, `(value = "/x")`, `(path = {"/x"})`.
fn mapping_path(args: Option<&str>) -> Option<String> {
    let a = args?.trim();
    if let Some(m) = path_attr_re().find(a) {
        return first_string_literal(&a[m.end()..]);
    }
    if a.starts_with('"') || a.starts_with('{') {
        return first_string_literal(a);
    }
    None
}

/// Routing annotation among `anns`, joined onto the class-level prefix.
fn route_from_annotations(anns: &[Annotation], prefix: &str) -> Option<HttpRoute> {
    for ann in anns {
        if let Some(verb) = first_match(JAVA_HTTP_MARKERS, |m| m == ann.name) {
            let path = mapping_path(ann.args.as_deref()).unwrap_or_default();
            return Some(HttpRoute::new(verb, join_route(prefix, &path)));
        }
        if ann.name == JAVA_GENERIC_MAPPING {
            let verb = ann
                .args
                .as_deref()
                .and_then(|a| method_attr_re().captures(a))
                .and_then(|c| HttpMethod::from_token(&c[1]))
                .unwrap_or(HttpMethod::Get);
            let path = mapping_path(ann.args.as_deref()).unwrap_or_default();
            return Some(HttpRoute::new(verb, join_route(prefix, &path)));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

struct MemberMatch {
    name: String,
    /// Byte offset of the name within the matched (annotation-stripped) text.
    name_end: usize,
}

fn match_member(text: &str, class_name: &str) -> Option<MemberMatch> {
    if let Some(c) = member_re().captures(text) {
        let ty = c.get(1)?.as_str();
        let name = c.get(2)?;
        let ty_head = ty.split(['<', '[']).next().unwrap_or(ty).trim();
        let is_keyword = |t: &str| JAVA_NON_MEMBER_KEYWORDS.contains(&t);
        let is_modifier_only = JAVA_MODIFIERS.contains(&ty_head);
        if !is_keyword(ty_head) && !is_keyword(name.as_str()) && !is_modifier_only && ty_head != "class" {
            return Some(MemberMatch {
                name: name.as_str().to_string(),
                name_end: name.end(),
            });
        }
    }
    if let Some(c) = ctor_re().captures(text) {
        let name = c.get(1)?;
        if name.as_str() == class_name {
            return Some(MemberMatch {
                name: name.as_str().to_string(),
                name_end: name.end(),
            });
        }
    }
    None
}

/// Join the signature starting at `start` through the line holding `{` or `;`.
fn collapse_signature(lines: &[JavaLine], start: usize) -> (String, usize) {
    let mut joined = String::new();
    let end_limit = (start + MAX_SIGNATURE_LINES).min(lines.len());
    let mut end = start;
    for (idx, line) in lines.iter().enumerate().take(end_limit).skip(start) {
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(line.bare.trim());
        end = idx;
        if line.bare.contains('{') || line.bare.contains(';') {
            break;
        }
    }
    (joined, end)
}

fn declared_exceptions(collapsed: &str) -> Vec<String> {
    throws_re()
        .captures(collapsed)
        .map(|c| {
            c[1].split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Split on commas that are not nested inside `<>`, `()` or `{}`.
fn split_top_level_commas(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        match c {
            '<' | '(' | '{' | '[' => depth += 1,
            '>' | ')' | '}' | ']' => depth -= 1,
            ',' if depth == 0 => {
                out.push(&s[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Leading type of one parameter with annotations, modifiers, generics and array markers removed.
fn parameter_type(param: &str) -> Option<String> {
    let (_, rest) = split_leading_annotations(param);
    let mut rest = rest.trim_start();
    while let Some(r) = rest.strip_prefix("final ") {
        rest = r.trim_start();
    }
    let mut depth = 0i32;
    let mut end = rest.len();
    for (idx, c) in rest.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                // `Map <K, V>` keeps going; a bare space before the name ends the type.
                if !rest[idx..].trim_start().starts_with('<') {
                    end = idx;
                    break;
                }
            }
            _ => {}
        }
    }
    let ty = &rest[..end];
    let bare = ty.split('<').next().unwrap_or(ty);
    let bare = bare.trim().trim_end_matches("...").trim_end_matches("[]").trim_end_matches("[]");
    let bare = bare.trim_end_matches("...");
    if bare.is_empty() || !bare.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false) {
        return None;
    }
    Some(bare.to_string())
}

fn parameter_list(collapsed: &str, name_end: usize) -> Option<&str> {
    let open = collapsed.get(name_end..)?.find('(')? + name_end;
    let close = matching_paren(collapsed, open)?;
    Some(&collapsed[open + 1..close])
}

/// Ordered candidates: qualified name, import map, then same package.
fn type_candidates(bare: &str, imports: &BTreeMap<String, String>, package: &str) -> Vec<String> {
    if bare.chars().next().map(|c| c.is_lowercase()).unwrap_or(true) && !bare.contains('.') {
        return vec![];
    }
    if bare.contains('.') {
        return vec![bare.to_string()];
    }
    let mut out = Vec::new();
    if let Some(fqn) = imports.get(bare) {
        out.push(fqn.clone());
    }
    let local = qualify(package, bare);
    if !out.contains(&local) {
        out.push(local);
    }
    out
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Analyse Java source text for the type identified by `identifier`.
pub fn analyze_java_source(source: &str, identifier: &str) -> FileFacts {
    let lines = split_lines(source);
    let package = identifier.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
    let mut facts = FileFacts::default();

    let decl = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_blank())
        .find_map(|(idx, l)| {
            decl_re()
                .captures(&l.bare)
                .map(|c| (idx, c[1].to_string(), c[2].to_string()))
        });

    // Imports precede the first type declaration.
    let import_end = decl.as_ref().map(|(idx, _, _)| *idx).unwrap_or(lines.len());
    let mut import_map: BTreeMap<String, String> = BTreeMap::new();
    for line in &lines[..import_end] {
        let Some(c) = import_re().captures(&line.bare) else { continue };
        let is_static = c.get(1).is_some();
        let target = &c[2];
        let resolved = if is_static {
            // `import static a.b.Type.member;` -> owning type `a.b.Type`
            match target.rsplit_once('.') {
                Some((owner, _)) => owner.to_string(),
                None => continue,
            }
        } else if target.ends_with(".*") {
            continue;
        } else {
            target.to_string()
        };
        let simple = resolved.rsplit('.').next().unwrap_or(&resolved).to_string();
        if !is_static {
            import_map.insert(simple.clone(), resolved.clone());
        }
        facts.imports.push(ImportBinding {
            imported: simple.clone(),
            local: simple,
            source: resolved.clone(),
        });
        facts.raw_references.insert(resolved);
    }

    let Some((decl_idx, keyword, class_name)) = decl else {
        return facts;
    };

    // Marker annotations before the declaration (and inline on it).
    let header: String = lines[..=decl_idx]
        .iter()
        .map(|l| l.code.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let class_anns = annotations_in(&header);
    let has = |marker: &str| class_anns.iter().any(|a| a.name == marker);

    let decl_line = &lines[decl_idx].bare;
    facts.role = first_match(JAVA_ROLE_MARKERS, has)
        .or_else(|| extends_throwable_re().is_match(decl_line).then_some(Role::Exception))
        .or_else(|| (keyword == "record").then_some(Role::Dto))
        .or_else(|| first_match(JAVA_NAME_SUFFIXES, |s| class_name.ends_with(s)))
        .unwrap_or_default();
    facts.is_entry_point = JAVA_ENTRY_ROLE_MARKERS.iter().any(|m| has(m));

    // Whole-file pass: entry markers may sit on members inside the body.
    let file_markers: BTreeSet<String> = lines
        .iter()
        .flat_map(|l| {
            annotation_name_re()
                .captures_iter(&l.bare)
                .map(|c| c[1].rsplit('.').next().unwrap_or(&c[1]).to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    if JAVA_ENTRY_MARKERS.iter().any(|m| file_markers.contains(*m))
        || lines.iter().any(|l| main_method_re().is_match(&l.bare))
    {
        facts.is_entry_point = true;
    }
    if facts.role.is_other() && JAVA_LISTENER_MARKERS.iter().any(|m| file_markers.contains(*m)) {
        facts.role = Role::Listener;
    }

    let prefix = class_anns
        .iter()
        .find(|a| a.name == JAVA_GENERIC_MAPPING)
        .and_then(|a| mapping_path(a.args.as_deref()))
        .unwrap_or_default();

    extract_members(&lines, decl_idx, &class_name, &prefix, package, &import_map, &mut facts);

    // Same-package usages: capitalised tokens in the body. A token after `.` is a
    // qualified name or a member, never a same-package type.
    for line in &lines[decl_idx..] {
        for c in type_token_re().captures_iter(&line.bare) {
            let Some(m) = c.get(1) else { continue };
            let token = m.as_str();
            if token == class_name || line.bare[..m.start()].ends_with('.') {
                continue;
            }
            match import_map.get(token) {
                Some(fqn) => facts.raw_references.insert(fqn.clone()),
                None => facts.raw_references.insert(qualify(package, token)),
            };
        }
        for c in qualified_type_re().captures_iter(&line.bare) {
            facts.raw_references.insert(c[1].to_string());
        }
    }

    facts
}

fn extract_members(
    lines: &[JavaLine],
    decl_idx: usize,
    class_name: &str,
    prefix: &str,
    package: &str,
    imports: &BTreeMap<String, String>,
    facts: &mut FileFacts,
) {
    let mut depth: i32 = 0;
    let mut body_open = false;
    let mut i = decl_idx;

    while i < lines.len() {
        let line = &lines[i];
        if body_open && depth == 1 && i != decl_idx && !line.is_blank() {
            let (inline_anns, rest_code) = split_leading_annotations(&line.code);
            let rest_bare = blank_strings(rest_code);
            if let Some(member) = match_member(&rest_bare, class_name) {
                let mut anns = lookback_annotations(lines, i, decl_idx);
                anns.extend(inline_anns);

                let (collapsed_tail, end) = collapse_signature(lines, i);
                // Re-anchor on the annotation-stripped first line.
                let first_bare = lines[i].bare.trim();
                let skip = first_bare.len().saturating_sub(rest_bare.trim().len());
                let collapsed = collapsed_tail.get(skip..).unwrap_or(&collapsed_tail).to_string();
                let leading_ws = rest_bare.len() - rest_bare.trim_start().len();
                let name_end = member.name_end.saturating_sub(leading_ws).min(collapsed.len());

                let mut method = MethodDescriptor::new(member.name.clone(), (i + 1) as u32)
                    .with_route(route_from_annotations(&anns, prefix));
                method.declared_exceptions = declared_exceptions(&collapsed);

                let method_index = facts.methods.len();
                if let Some(params) = parameter_list(&collapsed, name_end) {
                    for (position, param) in split_top_level_commas(params).into_iter().enumerate() {
                        let Some(bare) = parameter_type(param) else { continue };
                        let candidates = type_candidates(&bare, imports, package);
                        if candidates.is_empty() {
                            continue;
                        }
                        facts.parameter_references.push(ParameterReference {
                            method_index,
                            position,
                            candidates,
                        });
                    }
                }
                facts.methods.push(method);

                for l in &lines[i..=end] {
                    depth += brace_delta(&l.bare);
                }
                i = end + 1;
                continue;
            }
        }

        for c in line.bare.chars() {
            match c {
                '{' => {
                    depth += 1;
                    body_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        i += 1;
    }
}

/// Annotations in the few lines directly above `idx`, stopping at the previous member.
fn lookback_annotations(lines: &[JavaLine], idx: usize, floor: usize) -> Vec<Annotation> {
    let mut chunks: Vec<&str> = Vec::new();
    let lower = idx.saturating_sub(JAVA_ANNOTATION_LOOKBACK).max(floor + 1);
    for j in (lower..idx).rev() {
        let line = &lines[j];
        if line.is_blank() {
            continue;
        }
        let t = line.bare.trim();
        if !t.starts_with('@') && (t.ends_with(';') || t.ends_with('}') || t.ends_with('{')) {
            break;
        }
        chunks.push(line.code.as_str());
    }
    chunks.reverse();
    annotations_in(&chunks.join("\n"))
}
