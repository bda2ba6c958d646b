use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::model::{Diagnostic, DiagnosticKind};

/// Dependency and build output trees of script projects. Java source roots do not use
/// this list because `build`, `vendor` or `out` are ordinary package names there.
pub const BUILD_OUTPUT_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    "coverage",
    ".next",
    ".nuxt",
    "out",
    "vendor",
    ".gradle",
];

fn exclusion_overrides(root: &Path, build_dirs: &[&str], exclude_dir_names: &[String]) -> Result<Override> {
    let mut ob = OverrideBuilder::new(root);
    let names = build_dirs
        .iter()
        .copied()
        .chain(exclude_dir_names.iter().map(|d| d.trim().trim_matches('/')))
        .filter(|d| !d.is_empty());
    for d in names {
        ob.add(&format!("!**/{d}"))?;
    }
    Ok(ob.build()?)
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub abs_path: PathBuf,
    /// Relative to the project root, `/`-separated.
    pub rel_path: String,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub project_root: PathBuf,
    pub source_root: PathBuf,
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
    /// File-name suffixes to reject even when the extension matches (e.g. `.d.ts`).
    pub reject_suffixes: Vec<String>,
    pub max_file_bytes: u64,
    pub max_files: usize,
    /// Built-in directory names to skip, usually [`BUILD_OUTPUT_DIRS`] or empty.
    pub build_dirs: &'static [&'static str],
    pub exclude_dir_names: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<FileEntry>,
    pub diagnostics: Vec<Diagnostic>,
    /// False when the source root does not exist.
    pub root_present: bool,
}

/// Walk `source_root` in a stable order and return matching files sorted by relative path.
pub fn scan_source_root(opts: &ScanOptions, backend: &str) -> Result<ScanOutcome> {
    let mut out = ScanOutcome::default();
    if !opts.source_root.is_dir() {
        return Ok(out);
    }
    out.root_present = true;

    let overrides = exclusion_overrides(&opts.source_root, opts.build_dirs, &opts.exclude_dir_names)?;
    let excluded: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
    let sink = Arc::clone(&excluded);
    let walker = WalkBuilder::new(&opts.source_root)
        .standard_filters(true) // .gitignore, .ignore, hidden, etc.
        .require_git(false)
        .filter_entry(move |dent| {
            let is_dir = dent.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
            if dent.depth() == 0 || !is_dir || !overrides.matched(dent.path(), true).is_ignore() {
                return true;
            }
            if let Ok(mut dirs) = sink.lock() {
                dirs.push(dent.path().to_path_buf());
            }
            false
        })
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for item in walker {
        let dent = match item {
            Ok(d) => d,
            Err(err) => {
                tracing::debug!("walk error under {}: {err}", opts.source_root.display());
                continue;
            }
        };

        if !dent.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let abs_path = dent.into_path();
        if !has_wanted_extension(&abs_path, &opts.extensions, &opts.reject_suffixes) {
            continue;
        }

        let rel_path = rel_str(&opts.project_root, &abs_path);

        let bytes = match std::fs::metadata(&abs_path).map(|m| m.len()) {
            Ok(b) => b,
            Err(err) => {
                out.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::ReadFailure, backend, err.to_string()).at(&rel_path),
                );
                continue;
            }
        };

        if bytes > opts.max_file_bytes {
            out.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::FileTooLarge,
                    backend,
                    format!("{bytes} bytes exceeds limit of {}", opts.max_file_bytes),
                )
                .at(&rel_path),
            );
            continue;
        }

        out.files.push(FileEntry {
            abs_path,
            rel_path,
            bytes,
        });
    }

    let excluded = excluded.lock().map(|dirs| dirs.clone()).unwrap_or_default();
    for dir in excluded {
        out.diagnostics.push(
            Diagnostic::new(DiagnosticKind::ExcludedDirectory, backend, "directory excluded from scan")
                .at(rel_str(&opts.project_root, &dir)),
        );
    }

    out.files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    if out.files.len() > opts.max_files {
        let dropped = out.files.split_off(opts.max_files);
        for f in dropped {
            out.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::FileLimitReached,
                    backend,
                    format!("file cap of {} reached", opts.max_files),
                )
                .at(f.rel_path),
            );
        }
    }

    Ok(out)
}

fn has_wanted_extension(path: &Path, extensions: &[String], reject_suffixes: &[String]) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();
    if reject_suffixes.iter().any(|s| name.ends_with(s.as_str())) {
        return false;
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    extensions.iter().any(|e| *e == ext)
}

/// `path` relative to `base` with forward slashes; falls back to the full path.
pub fn rel_str(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    normalize_slash(rel)
}

pub fn normalize_slash(p: &Path) -> String {
    p.to_string_lossy().replace('\\', "/")
}

/// Read a file as UTF-8 (lossy) after re-checking the size cap.
pub fn read_source(path: &Path, max_file_bytes: u64) -> crate::error::Result<String> {
    let bytes = std::fs::metadata(path)?.len();
    if bytes > max_file_bytes {
        return Err(crate::error::AnalysisError::FileTooLarge {
            path: path.to_path_buf(),
            bytes,
            limit: max_file_bytes,
        });
    }
    let raw = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}
