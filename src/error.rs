use std::path::PathBuf;

use thiserror::Error;

/// pileschema errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid document at '{path}': {message}")]
    Binding { path: String, message: String },

    #[error("Schema validation failed:\n{}", problems.join("\n"))]
    Validation { problems: Vec<String> },

    #[error("View '{view}' has no subset; unknown view type")]
    UnknownViewKind { view: String },

    #[error("'{from}' references unknown table '{table}'")]
    UnknownTable { from: String, table: String },

    #[error("Code generation failed for '{table}': {message}")]
    CodeGen { table: String, message: String },

    #[error("Template '{template}' failed: {message}")]
    Template { template: String, message: String },

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SchemaError {
    pub(crate) fn binding(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Binding {
            path: path.into(),
            message: message.into(),
        }
    }
}
