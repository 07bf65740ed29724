//! Core library for selecting CAM process files.
//!
//! This crate provides:
//! - Parsing of recognized feature panel text into named fields
//! - Numeric normalization of OCR-noisy field values
//! - A declarative, validated rule table (keywords, ranges, targets)
//! - Resolution of a rule target to a `.prc` file below a material root

pub mod config;
pub mod error;
pub mod fields;
pub mod patterns;
pub mod resolver;
pub mod rules;

pub use config::ProcselConfig;
pub use error::{ProcselError, Result, RuleTableError};
pub use fields::{ExtractedFields, FieldName, FieldParser, Measure, Measurements};
pub use resolver::{NoMatchReason, Resolution, ResolutionReport, ResolvedFile, Resolver};
pub use rules::{Action, Condition, Rule, RuleOrdering, RuleTable, Target, TableWarning};
