pub mod backend;
pub mod config;
pub mod error;
pub mod framework;
pub mod golang;
pub mod graph;
pub mod java;
pub mod model;
pub mod patterns;
pub mod resolver;
pub mod scanner;
pub mod script;

pub use error::{AnalysisError, Result};
pub use graph::{analyze_project, AnalysisReport};
pub use model::ProjectGraph;
