//! Error types for ocbind-gen.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, GenError>;

/// Errors that abort a generation run.
///
/// Per-declaration anomalies are not errors; they are collected on the run
/// context as diagnostics and the declaration is skipped.
#[derive(Error, Diagnostic, Debug)]
pub enum GenError {
    /// Failed to read the policy file.
    #[error("Failed to read policy file: {0}")]
    ReadPolicy(#[source] std::io::Error),

    /// Failed to parse the policy TOML.
    #[error("Failed to parse policy TOML: {0}")]
    ParsePolicy(#[from] toml::de::Error),

    /// Policy validation error.
    #[error("Policy validation error: {0}")]
    Validation(String),

    /// The AST backend could not produce a translation unit for a module.
    #[error("Failed to parse module '{module}': {reason}")]
    ModuleParse { module: String, reason: String },

    /// Failed to write a generated file.
    #[error("Failed to write {path}: {source}")]
    WriteOutput {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
