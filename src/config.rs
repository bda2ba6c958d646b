use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};

pub const CONFIG_FILE_NAME: &str = ".archgraph.json";

/// Ceiling applied on top of `limits.max_file_bytes`; no config can raise it.
pub const ABSOLUTE_MAX_FILE_BYTES: u64 = 1_000_000; // 1 MB

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Files above this size are skipped and reported as diagnostics.
    pub max_file_bytes: u64,
    /// Units beyond this count (per run, all backends together) are skipped.
    pub max_files: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 512 * 1024,
            max_files: 20_000,
        }
    }
}

impl LimitsConfig {
    pub fn effective_max_file_bytes(&self) -> u64 {
        self.max_file_bytes.min(ABSOLUTE_MAX_FILE_BYTES)
    }
}

/// Extra skips on top of `.gitignore` and the built-in vendor directories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory names (not paths) skipped anywhere under a source root.
    pub exclude_dir_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaConfig {
    pub enabled: bool,
    /// Source roots relative to the project root.
    pub source_roots: Vec<PathBuf>,
}

impl Default for JavaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_roots: vec![PathBuf::from("src/main/java")],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub enabled: bool,
    /// Overrides the framework's conventional source root.
    pub source_root: Option<PathBuf>,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_root: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    pub enabled: bool,
    /// External analyzer executable; its stdout must be one JSON document.
    pub command: String,
    pub args: Vec<String>,
    /// Append the module root as the final argument.
    pub append_root: bool,
    pub timeout_secs: u64,
    /// Read a precomputed analyzer document instead of running the command.
    pub document: Option<PathBuf>,
}

impl Default for GoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "go-analyzer".to_string(),
            args: vec!["-json".to_string()],
            append_root: true,
            timeout_secs: 120,
            document: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    /// Settings that govern file discovery and exclusion.
    pub scan: ScanConfig,
    pub java: JavaConfig,
    pub script: ScriptConfig,
    pub go: GoConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_file_bytes == 0 {
            return Err(AnalysisError::Config {
                message: "limits.max_file_bytes must be positive".into(),
            });
        }
        if self.limits.max_files == 0 {
            return Err(AnalysisError::Config {
                message: "limits.max_files must be positive".into(),
            });
        }
        if self.go.enabled && self.go.timeout_secs == 0 {
            return Err(AnalysisError::Config {
                message: "go.timeout_secs must be positive".into(),
            });
        }
        Ok(())
    }
}

pub fn load_config(repo_root: &Path) -> Config {
    load_config_file(&repo_root.join(CONFIG_FILE_NAME))
}

/// Missing or malformed files fall back to defaults.
pub fn load_config_file(path: &Path) -> Config {
    let text = std::fs::read_to_string(path);
    let Ok(text) = text else { return Config::default() };

    serde_json::from_str::<Config>(&text).unwrap_or_else(|err| {
        tracing::warn!("ignoring malformed config {}: {err}", path.display());
        Config::default()
    })
}
