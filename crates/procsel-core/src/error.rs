//! Error types for the procsel-core library.

use thiserror::Error;

/// Main error type for the procsel library.
#[derive(Error, Debug)]
pub enum ProcselError {
    /// Rule table loading or validation error.
    #[error("rule table error: {0}")]
    RuleTable(#[from] RuleTableError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while loading or validating a rule table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleTableError {
    /// The table could not be parsed.
    #[error("failed to parse rule table: {0}")]
    Parse(String),

    /// The table contains no rules.
    #[error("rule table '{0}' contains no rules")]
    Empty(String),

    /// A rule has no keywords at all.
    #[error("rule #{rule} has no keywords")]
    NoKeywords { rule: usize },

    /// A keyword is empty or whitespace only.
    #[error("rule #{rule} has a blank keyword")]
    BlankKeyword { rule: usize },

    /// A target descriptor is unusable.
    #[error("rule #{rule} has an invalid target: {reason}")]
    InvalidTarget { rule: usize, reason: String },

    /// A dynamic action without branches can never produce a target.
    #[error("rule #{rule} has a dynamic action without branches")]
    EmptyDynamic { rule: usize },

    /// A numeric bound is malformed.
    #[error("rule #{rule} has an invalid range: {reason}")]
    InvalidRange { rule: usize, reason: String },

    /// A general keyword is checked before a more specific one.
    #[error(
        "keyword '{general}' (rule #{general_rule}) shadows the more specific '{specific}' (rule #{specific_rule})"
    )]
    Specificity {
        general: String,
        general_rule: usize,
        specific: String,
        specific_rule: usize,
    },
}

/// Result type for the procsel library.
pub type Result<T> = std::result::Result<T, ProcselError>;
