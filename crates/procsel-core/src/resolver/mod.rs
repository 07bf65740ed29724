//! Rule resolution: extracted fields + material root → process file.

pub mod fs;

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RuleTableError;
use crate::fields::{ExtractedFields, Measurements};
use crate::rules::{EvalContext, KeywordHit, KeywordMatcher, Rule, RuleTable, Target, TableWarning};

/// A resolved process file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedFile {
    /// Absolute path of the selected `.prc` file.
    pub path: PathBuf,
    /// 1-based authored position of the deciding rule.
    pub rule: usize,
    pub keywords: Vec<String>,
    pub target: Target,
}

/// Why no process file was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum NoMatchReason {
    /// Missing feature type, empty field map or empty root path.
    InvalidInput(String),
    /// No rule's keywords match the feature type.
    NoKeywordMatch,
    /// Rules were eligible, but every predicate or action declined.
    AllDeclined,
    /// Rules produced targets, but none of their directories exist.
    DirectoriesMissing,
    /// Target directories exist but hold no file with the wanted prefix.
    NoMatchingFile,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Resolved(ResolvedFile),
    NoMatch { reason: NoMatchReason },
}

impl Resolution {
    fn no_match(reason: NoMatchReason) -> Self {
        Resolution::NoMatch { reason }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Resolution::Resolved(file) => Some(&file.path),
            Resolution::NoMatch { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&NoMatchReason> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::NoMatch { reason } => Some(reason),
        }
    }
}

/// What happened to one keyword-eligible rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    PredicateFailed,
    Declined,
    DirectoryMissing { dir: PathBuf },
    DirectoryUnreadable { dir: PathBuf, error: String },
    NoMatchingFile { dir: PathBuf, prefix: String },
    Resolved { path: PathBuf },
}

/// Trace entry for a keyword-eligible rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleStep {
    pub rule: usize,
    pub keywords: Vec<String>,
    pub hit: KeywordHit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Resolution plus everything that led to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionReport {
    pub feature_type: Option<String>,
    pub profile: Option<String>,
    pub measurements: Measurements,
    pub steps: Vec<RuleStep>,
    pub resolution: Resolution,
    pub elapsed_ms: u64,
}

/// Evaluates a rule table against extracted fields.
///
/// Holds no per-call state; one instance can serve any number of
/// evaluations, also from several threads.
#[derive(Debug, Clone)]
pub struct Resolver {
    table_name: String,
    rules: Vec<(usize, Rule)>,
    matcher: KeywordMatcher,
    warnings: Vec<TableWarning>,
    profile: Option<String>,
}

impl Resolver {
    /// Validate the table and fix its priority order.
    pub fn new(table: RuleTable) -> Result<Self, RuleTableError> {
        let warnings = table.validate()?;
        let rules = table
            .ordered_rules()
            .into_iter()
            .map(|(n, rule)| (n, rule.clone()))
            .collect();

        Ok(Self {
            matcher: KeywordMatcher::new(&table.exact_keywords, table.exact_fallback),
            table_name: table.name,
            rules,
            warnings,
            profile: None,
        })
    }

    /// Resolver over the embedded default table.
    pub fn builtin() -> Result<Self, RuleTableError> {
        Self::new(RuleTable::builtin()?)
    }

    /// Use a fixed profile instead of deriving it from the root folder name.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into().to_lowercase());
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn warnings(&self) -> &[TableWarning] {
        &self.warnings
    }

    /// Rules in priority order with their authored position.
    pub fn rules(&self) -> impl Iterator<Item = (usize, &Rule)> {
        self.rules.iter().map(|(n, rule)| (*n, rule))
    }

    pub fn evaluate(&self, fields: &ExtractedFields, root: &Path) -> Resolution {
        self.evaluate_with_report(fields, root).resolution
    }

    pub fn evaluate_with_report(&self, fields: &ExtractedFields, root: &Path) -> ResolutionReport {
        let start = Instant::now();
        let feature = fields.feature_type();
        let measurements = Measurements::from_fields(fields);

        let mut report = ResolutionReport {
            feature_type: feature.clone(),
            profile: None,
            measurements,
            steps: Vec::new(),
            resolution: Resolution::no_match(NoMatchReason::NoKeywordMatch),
            elapsed_ms: 0,
        };

        let invalid = if fields.is_empty() {
            Some("no fields extracted")
        } else if feature.is_none() {
            Some("feature type is missing")
        } else if root.as_os_str().is_empty() {
            Some("material root path is empty")
        } else {
            None
        };

        let feature = match (invalid, feature) {
            (None, Some(feature)) => feature,
            (reason, _) => {
                let reason = reason.unwrap_or("feature type is missing");
                warn!(
                    "Resolution with incomplete input: {} (fields: {}, root: '{}')",
                    reason,
                    fields.len(),
                    root.display()
                );
                report.resolution = Resolution::no_match(NoMatchReason::InvalidInput(reason.to_string()));
                return report;
            }
        };

        let root = fs::absolute_root(root);
        let profile = self.profile.clone().or_else(|| fs::profile_name(&root));
        report.profile = profile.clone();

        info!(
            "Searching process file: feature='{}', {:?}, root='{}'",
            feature,
            measurements,
            root.display()
        );

        let ctx = EvalContext {
            feature: &feature,
            measurements: &measurements,
            profile: profile.as_deref(),
        };

        let (resolution, steps) = self.scan(&ctx, &root);
        report.resolution = resolution;
        report.steps = steps;
        report.elapsed_ms = start.elapsed().as_millis() as u64;
        report
    }

    fn scan(&self, ctx: &EvalContext<'_>, root: &Path) -> (Resolution, Vec<RuleStep>) {
        let mut steps = Vec::new();
        let mut eligible = 0usize;
        let mut targets = 0usize;
        let mut listed = 0usize;

        for (number, rule) in &self.rules {
            let Some(hit) = self.matcher.matches(ctx.feature, &rule.keywords) else {
                continue;
            };
            eligible += 1;

            let mut step = RuleStep {
                rule: *number,
                keywords: rule.keywords.clone(),
                hit,
                target: None,
                outcome: StepOutcome::PredicateFailed,
            };

            if !rule.predicate_holds(ctx) {
                debug!(
                    "Rule #{} [{}]: predicate not met ({:?})",
                    number,
                    rule.keyword_label(),
                    ctx.measurements
                );
                steps.push(step);
                continue;
            }

            let Some(target) = rule.action.target(ctx) else {
                debug!("Rule #{} [{}]: action declined", number, rule.keyword_label());
                step.outcome = StepOutcome::Declined;
                steps.push(step);
                continue;
            };
            targets += 1;
            step.target = Some(target.clone());

            info!(
                "Rule #{} [{}] matched: subdir '{}', prefix '{}_'",
                number,
                rule.keyword_label(),
                target.subdir,
                target.prefix
            );

            let dir = fs::target_dir(root, &target.subdir);
            if !dir.is_dir() {
                warn!(
                    "Target directory '{}' for rule #{} not found",
                    dir.display(),
                    number
                );
                step.outcome = StepOutcome::DirectoryMissing { dir };
                steps.push(step);
                continue;
            }

            match fs::find_prefixed_file(&dir, &target.prefix) {
                Ok(Some(path)) => {
                    info!("Selected process file: {}", path.display());
                    step.outcome = StepOutcome::Resolved { path: path.clone() };
                    steps.push(step);

                    let resolved = ResolvedFile {
                        path,
                        rule: *number,
                        keywords: rule.keywords.clone(),
                        target: target.clone(),
                    };
                    return (Resolution::Resolved(resolved), steps);
                }
                Ok(None) => {
                    listed += 1;
                    info!(
                        "No .prc file with prefix '{}_' in '{}'",
                        target.prefix,
                        dir.display()
                    );
                    step.outcome = StepOutcome::NoMatchingFile {
                        dir,
                        prefix: target.prefix.clone(),
                    };
                }
                Err(e) => {
                    warn!("Failed to read directory '{}': {}", dir.display(), e);
                    step.outcome = StepOutcome::DirectoryUnreadable {
                        dir,
                        error: e.to_string(),
                    };
                }
            }
            steps.push(step);
        }

        let reason = if eligible == 0 {
            NoMatchReason::NoKeywordMatch
        } else if targets == 0 {
            NoMatchReason::AllDeclined
        } else if listed == 0 {
            NoMatchReason::DirectoriesMissing
        } else {
            NoMatchReason::NoMatchingFile
        };

        warn!(
            "No rule with an existing file for feature '{}' below '{}' ({:?})",
            ctx.feature,
            root.display(),
            reason
        );

        (Resolution::no_match(reason), steps)
    }
}
