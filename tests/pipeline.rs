mod common;

use archgraph::backend::BackendKind;
use archgraph::config::{load_config, Config};
use archgraph::graph::{analyze_project, BackendStatus};
use archgraph::model::{DependencyEdge, DiagnosticKind, HttpMethod, Role};
use common::{polyglot_fixture, write};
use tempfile::TempDir;

#[test]
fn polyglot_project_builds_one_graph() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    polyglot_fixture(root);

    let report = analyze_project(root, &load_config(root), &[]).unwrap();
    assert!(!report.is_partial());
    for name in ["java", "script", "go"] {
        assert_eq!(report.backend(name).unwrap().status, BackendStatus::Succeeded, "{name}");
    }

    let g = &report.graph;

    // Java
    let ctrl = g.entity("com.acme.users.UserController").unwrap();
    assert_eq!(ctrl.role, Role::Controller);
    assert!(ctrl.is_entry_point);
    assert_eq!(ctrl.language, "java");
    let get = ctrl.methods.iter().find(|m| m.name == "getUser").unwrap();
    assert_eq!(get.http_method, Some(HttpMethod::Get));
    assert_eq!(get.http_path.as_deref(), Some("/users/{id}"));
    let create = ctrl.methods.iter().find(|m| m.name == "create").unwrap();
    assert_eq!(create.http_path.as_deref(), Some("/users"));
    assert_eq!(create.declared_exceptions, vec!["IOException".to_string()]);
    assert_eq!(create.parameter_identifiers, vec!["com.acme.users.UserDto".to_string()]);
    assert_eq!(g.entity("com.acme.users.UserService").unwrap().role, Role::Service);
    assert_eq!(g.entity("com.acme.users.UserDto").unwrap().role, Role::Dto);
    assert!(g.edges.contains(&DependencyEdge::file_level(
        "com.acme.users.UserController",
        "com.acme.users.UserService"
    )));
    assert!(g.edges.contains(&DependencyEdge::parameter(
        "com.acme.users.UserController",
        "com.acme.users.UserDto",
        "create",
        0
    )));

    // TypeScript
    let nest = g.entity("users/users.controller").unwrap();
    assert_eq!(nest.role, Role::Controller);
    assert_eq!(nest.source_file, "src/users/users.controller.ts");
    assert!(g.edges.contains(&DependencyEdge::parameter(
        "users/users.controller",
        "users/users.service",
        "constructor",
        0
    )));
    assert_eq!(g.entity("users/users.service").unwrap().role, Role::Service);
    assert_eq!(g.entity("users/dto/create-user.dto").unwrap().role, Role::Dto);
    assert!(g.entity("main").unwrap().is_entry_point);
    // `./app.module` is not in the project: no edge, no diagnostic.
    assert!(g.edges_from("main").next().is_none());
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    // Go
    let handler = g.entity("example.com/shop/internal/orders.OrderHandler").unwrap();
    assert_eq!(handler.role, Role::Controller);
    assert_eq!(handler.language, "go");
    assert!(g.edges.contains(&DependencyEdge::file_level(
        "example.com/shop/internal/orders.OrderHandler",
        "example.com/shop/internal/orders.OrderStore"
    )));

    assert!(g.entry_points.contains(&"com.acme.users.UserController".to_string()));
    assert!(g.entry_points.contains(&"example.com/shop/internal/orders.OrderHandler".to_string()));
}

#[test]
fn graph_invariants_hold() {
    let tmp = TempDir::new().unwrap();
    polyglot_fixture(tmp.path());
    let report = analyze_project(tmp.path(), &load_config(tmp.path()), &[]).unwrap();
    let g = &report.graph;
    let known = g.identifiers();

    for e in &g.edges {
        assert!(known.contains(e.to.as_str()), "dangling edge {e:?}");
        assert!(!e.is_self_loop());
    }
    let mut deduped = g.edges.clone();
    deduped.dedup();
    assert_eq!(deduped.len(), g.edges.len());

    for entity in &g.entities {
        for m in &entity.methods {
            assert_eq!(m.http_method.is_some(), m.http_path.is_some(), "{}::{}", entity.identifier, m.name);
        }
    }

    let ids: Vec<&str> = g.entities.iter().map(|e| e.identifier.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn rerunning_an_unchanged_tree_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    polyglot_fixture(tmp.path());
    let cfg = load_config(tmp.path());

    let first = analyze_project(tmp.path(), &cfg, &[]).unwrap();
    let second = analyze_project(tmp.path(), &cfg, &[]).unwrap();
    assert_eq!(first.graph, second.graph);
    assert_eq!(first.fingerprint, second.fingerprint);

    write(tmp.path(), "src/users/users.repository.ts", "export class UsersRepository {}\n");
    let third = analyze_project(tmp.path(), &cfg, &[]).unwrap();
    assert_ne!(first.fingerprint, third.fingerprint);
}

#[test]
fn failing_go_analyzer_yields_a_partial_report() {
    let tmp = TempDir::new().unwrap();
    polyglot_fixture(tmp.path());
    let mut cfg = Config::default();
    cfg.go.command = "sh".into();
    cfg.go.args = vec!["-c".into(), "echo 'go: cannot load packages' >&2; exit 3".into()];
    cfg.go.append_root = false;

    let report = analyze_project(tmp.path(), &cfg, &[]).unwrap();
    assert!(report.is_partial());
    let go = report.backend("go").unwrap();
    assert_eq!(go.status, BackendStatus::Failed);
    assert!(go.reason.as_deref().unwrap().contains("cannot load packages"));
    assert!(report.graph.entities.iter().all(|e| e.language != "go"));
    assert!(report.graph.entity("com.acme.users.UserController").is_some());
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::BackendFailed && d.backend == "go"));
}

#[test]
fn hung_go_analyzer_is_cut_off() {
    let tmp = TempDir::new().unwrap();
    polyglot_fixture(tmp.path());
    let mut cfg = Config::default();
    cfg.go.command = "sh".into();
    cfg.go.args = vec!["-c".into(), "sleep 10".into()];
    cfg.go.append_root = false;
    cfg.go.timeout_secs = 1;

    let started = std::time::Instant::now();
    let report = analyze_project(tmp.path(), &cfg, &[]).unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(8));
    assert_eq!(report.backend("go").unwrap().status, BackendStatus::Failed);
    assert_eq!(report.backend("java").unwrap().status, BackendStatus::Succeeded);
}

#[test]
fn colliding_java_sources_keep_the_first_claimant() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "pom.xml", "<project/>");
    write(root, "src/main/java/com/acme/users/UserDto.java", common::USER_DTO);
    write(
        root,
        "src/generated/java/com/acme/users/UserDto.java",
        "package com.acme.users;\n\n@Entity\npublic class UserDto {}\n",
    );
    write(
        root,
        ".archgraph.json",
        r#"{ "java": { "source_roots": ["src/main/java", "src/generated/java"] } }"#,
    );

    let report = analyze_project(root, &load_config(root), &[]).unwrap();
    assert_eq!(report.graph.entities.len(), 1);
    assert_eq!(report.collisions.len(), 1);
    let c = &report.collisions[0];
    assert_eq!(c.identifier, "com.acme.users.UserDto");
    assert_eq!(c.kept, "java:src/generated/java/com/acme/users/UserDto.java");
    assert_eq!(c.dropped, vec!["java:src/main/java/com/acme/users/UserDto.java".to_string()]);
    let dto = report.graph.entity("com.acme.users.UserDto").unwrap();
    assert_eq!(dto.role, Role::Entity);
    assert_eq!(dto.source_file, "src/generated/java/com/acme/users/UserDto.java");
}

#[test]
fn broken_files_are_excluded_without_aborting() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "package.json", r#"{ "dependencies": { "express": "^4" } }"#);
    write(root, "src/broken.ts", "export class {\n  oops(\n");
    write(root, "src/ok.ts", "import { x } from './broken';\nexport const y = () => x;\n");

    let report = analyze_project(root, &Config::default(), &[]).unwrap();
    assert!(report.graph.entity("broken").is_none());
    assert!(report.graph.entity("ok").is_some());
    assert!(report.graph.edges.is_empty());
    let diag = report
        .diagnostics
        .iter()
        .find(|d| d.kind == DiagnosticKind::ParseFailure)
        .unwrap();
    assert_eq!(diag.path.as_deref(), Some("src/broken.ts"));
}

#[test]
fn missing_source_root_is_an_empty_contribution() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "pom.xml", "<project/>");
    let report = analyze_project(tmp.path(), &Config::default(), &[]).unwrap();
    assert_eq!(report.backend("java").unwrap().status, BackendStatus::Empty);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::MissingSourceRoot));
    assert!(!report.is_partial());
}

#[test]
fn oversized_files_are_reported() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "pom.xml", "<project/>");
    write(root, "src/main/java/a/Small.java", "package a;\npublic class Small {}\n");
    write(
        root,
        "src/main/java/a/Huge.java",
        &format!("package a;\npublic class Huge {{\n{}}}\n", "    int x;\n".repeat(200)),
    );
    let mut cfg = Config::default();
    cfg.limits.max_file_bytes = 256;

    let report = analyze_project(root, &cfg, &[BackendKind::Script, BackendKind::Go]).unwrap();
    assert!(report.graph.entity("a.Small").is_some());
    assert!(report.graph.entity("a.Huge").is_none());
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::FileTooLarge && d.path.as_deref() == Some("src/main/java/a/Huge.java")));
}

#[test]
fn java_packages_named_like_build_dirs_are_analyzed() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write(root, "pom.xml", "<project/>");
    write(
        root,
        "src/main/java/com/acme/vendor/VendorService.java",
        "package com.acme.vendor;\n\n@Service\npublic class VendorService {}\n",
    );
    write(
        root,
        "src/main/java/com/acme/build/BuildInfo.java",
        "package com.acme.build;\n\npublic class BuildInfo {}\n",
    );
    write(
        root,
        "src/main/java/com/acme/web/VendorController.java",
        r#"package com.acme.web;

import com.acme.vendor.VendorService;
import com.acme.build.BuildInfo;

@RestController
public class VendorController {
    private final VendorService vendors;

    @GetMapping("/build")
    public BuildInfo build() {
        return null;
    }
}
"#,
    );
    write(root, "src/main/java/com/acme/legacy/Old.java", "package com.acme.legacy;\npublic class Old {}\n");
    write(root, ".archgraph.json", r#"{ "scan": { "exclude_dir_names": ["legacy"] } }"#);

    let report = analyze_project(root, &load_config(root), &[]).unwrap();
    let g = &report.graph;
    assert!(g.entity("com.acme.vendor.VendorService").is_some());
    assert!(g.entity("com.acme.build.BuildInfo").is_some());
    assert!(g.edges.contains(&DependencyEdge::file_level(
        "com.acme.web.VendorController",
        "com.acme.vendor.VendorService"
    )));
    assert!(g.edges.contains(&DependencyEdge::file_level(
        "com.acme.web.VendorController",
        "com.acme.build.BuildInfo"
    )));

    assert!(g.entity("com.acme.legacy.Old").is_none());
    let excluded: Vec<&str> = report
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::ExcludedDirectory)
        .filter_map(|d| d.path.as_deref())
        .collect();
    assert_eq!(excluded, ["src/main/java/com/acme/legacy"]);
}
