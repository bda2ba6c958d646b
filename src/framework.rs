//! Framework detection for the scripting backend, run once per project.

use std::collections::BTreeSet;
use std::path::Path;

use crate::model::FrameworkInfo;
use crate::patterns::{
    FrameworkPattern, FEATURE_DECORATORS, FEATURE_STATIC_TYPING, FRAMEWORKS, UNKNOWN_FRAMEWORK,
    UNKNOWN_FRAMEWORK_ROOT,
};

pub const MANIFEST_FILE: &str = "package.json";

const DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "devDependencies", "peerDependencies"];

/// Declared package names across every dependency section. Malformed manifests yield nothing.
pub fn declared_dependencies(manifest: &str) -> BTreeSet<String> {
    let Ok(v) = serde_json::from_str::<serde_json::Value>(manifest) else {
        return BTreeSet::new();
    };
    let mut out = BTreeSet::new();
    for section in DEPENDENCY_SECTIONS {
        if let Some(map) = v.get(*section).and_then(|s| s.as_object()) {
            out.extend(map.keys().cloned());
        }
    }
    out
}

pub fn detect_framework(project_root: &Path) -> FrameworkInfo {
    let manifest = std::fs::read_to_string(project_root.join(MANIFEST_FILE)).unwrap_or_default();
    let deps = declared_dependencies(&manifest);
    let has_tsconfig = project_root.join("tsconfig.json").is_file();
    let info = framework_from_dependencies(&deps, has_tsconfig);
    tracing::debug!(
        "framework {} (root {}, features {:?})",
        info.name,
        info.conventional_source_root,
        info.features
    );
    info
}

/// Apply the fixed precedence list; the first framework with a declared dependency wins.
pub fn framework_from_dependencies(deps: &BTreeSet<String>, has_tsconfig: bool) -> FrameworkInfo {
    let declares_typescript = deps.contains("typescript");
    let matched: Option<&FrameworkPattern> = FRAMEWORKS
        .iter()
        .find(|fw| fw.dependencies.iter().any(|d| deps.contains(*d)));

    let mut info = match matched {
        Some(fw) => FrameworkInfo {
            name: fw.name.to_string(),
            conventional_source_root: fw.source_root.to_string(),
            features: fw.features.iter().map(|f| f.to_string()).collect(),
        },
        None => {
            let mut features = BTreeSet::new();
            if declares_typescript {
                features.insert(FEATURE_DECORATORS.to_string());
            }
            FrameworkInfo {
                name: UNKNOWN_FRAMEWORK.to_string(),
                conventional_source_root: UNKNOWN_FRAMEWORK_ROOT.to_string(),
                features,
            }
        }
    };

    if declares_typescript || has_tsconfig {
        info.features.insert(FEATURE_STATIC_TYPING.to_string());
    }
    info
}
