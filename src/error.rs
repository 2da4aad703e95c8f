//! Error types for the property generator

use thiserror::Error;

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Generator errors
///
/// Every variant is fatal for the run: generation is all-or-nothing, so
/// nothing is written once one of these has been raised.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Schema syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Invalid schema at `{path}` (line {line}): expected {expected}, found {found}")]
    Structural {
        path: String,
        line: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Duplicate key `{key}` in `{path}` (line {line})")]
    DuplicateKey { path: String, key: String, line: usize },

    #[error("Property `{path}` (line {line}) has no type")]
    EmptyType { path: String, line: usize },

    #[error("Unresolved alias `*{alias}` at `{path}` (line {line}): no group with that name has been defined before this point")]
    UnresolvedAlias { alias: String, path: String, line: usize },

    #[error("Recursive alias `*{alias}` at `{path}` (line {line}): a group cannot refer to itself or to a group enclosing it")]
    RecursiveAlias { alias: String, path: String, line: usize },

    #[error("Type name collision: group `{name}` (line {line}) resolves to `{type_name}`, already used by group `{existing}`")]
    NameCollision {
        name: String,
        type_name: String,
        existing: String,
        line: usize,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GeneratorError {
    /// Schema line the error points at, when it comes from the schema
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. }
            | Self::Structural { line, .. }
            | Self::DuplicateKey { line, .. }
            | Self::EmptyType { line, .. }
            | Self::UnresolvedAlias { line, .. }
            | Self::RecursiveAlias { line, .. }
            | Self::NameCollision { line, .. } => Some(*line),
            _ => None,
        }
    }
}
