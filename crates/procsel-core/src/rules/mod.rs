//! Declarative rule model: keyword gates, numeric predicates and targets.

mod matcher;
mod table;

pub use matcher::{KeywordHit, KeywordMatcher, MatchMode};
pub use table::{RuleOrdering, RuleTable, TableWarning, BUILTIN_RULES};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fields::{Measure, Measurements};

/// Tolerance used by [`Condition::Equals`].
pub const EQ_TOLERANCE: f64 = 1e-9;

/// Values a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Lower-cased feature type.
    pub feature: &'a str,
    /// Parsed numeric fields.
    pub measurements: &'a Measurements,
    /// Active profile, usually the material root's folder name.
    pub profile: Option<&'a str>,
}

/// A single predicate atom. A rule's predicate is the conjunction of its
/// conditions; an empty predicate always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// The measure is present and inside the bounds.
    Range {
        measure: Measure,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default = "inclusive", skip_serializing_if = "is_inclusive")]
        min_inclusive: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default = "inclusive", skip_serializing_if = "is_inclusive")]
        max_inclusive: bool,
    },
    /// The measure is present and equal to `value`.
    Equals { measure: Measure, value: f64 },
    /// The measure is present.
    Present { measure: Measure },
    /// The lower-cased feature type contains `text`.
    FeatureContains { text: String },
    /// The active profile is `name`.
    Profile { name: String },
}

fn inclusive() -> bool {
    true
}

fn is_inclusive(value: &bool) -> bool {
    *value
}

impl Condition {
    /// Inclusive range shorthand.
    pub fn between(measure: Measure, min: f64, max: f64) -> Self {
        Condition::Range {
            measure,
            min: Some(min),
            min_inclusive: true,
            max: Some(max),
            max_inclusive: true,
        }
    }

    pub fn holds(&self, ctx: &EvalContext<'_>) -> bool {
        match self {
            Condition::Range {
                measure,
                min,
                min_inclusive,
                max,
                max_inclusive,
            } => {
                let Some(value) = ctx.measurements.get(*measure) else {
                    return false;
                };
                let above = match min {
                    Some(min) if *min_inclusive => value >= *min,
                    Some(min) => value > *min,
                    None => true,
                };
                let below = match max {
                    Some(max) if *max_inclusive => value <= *max,
                    Some(max) => value < *max,
                    None => true,
                };
                above && below
            }
            Condition::Equals { measure, value } => ctx
                .measurements
                .get(*measure)
                .is_some_and(|v| (v - value).abs() <= EQ_TOLERANCE),
            Condition::Present { measure } => ctx.measurements.get(*measure).is_some(),
            Condition::FeatureContains { text } => ctx.feature.contains(&text.to_lowercase()),
            Condition::Profile { name } => ctx
                .profile
                .is_some_and(|p| p.eq_ignore_ascii_case(name)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Range {
                measure,
                min,
                min_inclusive,
                max,
                max_inclusive,
            } => {
                if let Some(min) = min {
                    write!(f, "{} {} ", min, if *min_inclusive { "<=" } else { "<" })?;
                }
                write!(f, "{:?}", measure)?;
                if let Some(max) = max {
                    write!(f, " {} {}", if *max_inclusive { "<=" } else { "<" }, max)?;
                }
                Ok(())
            }
            Condition::Equals { measure, value } => write!(f, "{:?} == {}", measure, value),
            Condition::Present { measure } => write!(f, "{:?} present", measure),
            Condition::FeatureContains { text } => write!(f, "feature contains '{}'", text),
            Condition::Profile { name } => write!(f, "profile '{}'", name),
        }
    }
}

/// Where a matching process file lives: a directory relative to the
/// material root and the file name prefix (`{prefix}_*.prc`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub subdir: String,
    pub prefix: String,
}

impl Target {
    pub fn new(subdir: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            subdir: subdir.into(),
            prefix: prefix.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}_]", self.subdir, self.prefix)
    }
}

/// One alternative of a dynamic action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when: Vec<Condition>,
    pub target: Target,
}

/// What a rule yields once its predicate holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Always the same target.
    Static(Target),
    /// First branch whose conditions hold; declines when none does.
    Dynamic(Vec<Branch>),
}

impl Action {
    pub fn target(&self, ctx: &EvalContext<'_>) -> Option<&Target> {
        match self {
            Action::Static(target) => Some(target),
            Action::Dynamic(branches) => branches
                .iter()
                .find(|b| b.when.iter().all(|c| c.holds(ctx)))
                .map(|b| &b.target),
        }
    }

    /// All targets this action can produce.
    pub fn targets(&self) -> Vec<&Target> {
        match self {
            Action::Static(target) => vec![target],
            Action::Dynamic(branches) => branches.iter().map(|b| &b.target).collect(),
        }
    }
}

/// A keyword-gated rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicate: Vec<Condition>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Rule {
    pub fn new(keywords: &[&str], predicate: Vec<Condition>, action: Action) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            predicate,
            action,
            note: None,
        }
    }

    pub fn predicate_holds(&self, ctx: &EvalContext<'_>) -> bool {
        self.predicate.iter().all(|c| c.holds(ctx))
    }

    /// Character count of the longest keyword.
    pub fn specificity(&self) -> usize {
        self.keywords
            .iter()
            .map(|k| k.chars().count())
            .max()
            .unwrap_or(0)
    }

    pub fn keyword_label(&self) -> String {
        self.keywords.join(" | ")
    }
}
