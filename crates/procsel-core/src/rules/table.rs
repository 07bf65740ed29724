//! Rule tables: loading, priority ordering and load-time validation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Action, Condition, Rule};
use crate::error::RuleTableError;
use crate::fields::Measure;

/// Default rule table shipped with the binary.
pub static BUILTIN_RULES: &str = include_str!("../../rules/default.json");

/// How rules are put into priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOrdering {
    /// Authored order.
    Declaration,
    /// Longest keyword first, ties in authored order.
    #[default]
    KeywordLength,
}

/// An ordered, validated set of rules plus its matching options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub name: String,

    #[serde(default)]
    pub ordering: RuleOrdering,

    /// Keywords that require whole-word matching.
    #[serde(default)]
    pub exact_keywords: BTreeSet<String>,

    /// Fall back to substring matching when no exact keyword matched.
    #[serde(default = "default_exact_fallback")]
    pub exact_fallback: bool,

    /// Gaps between neighbouring ranges up to this width are not reported.
    #[serde(default = "default_gap_tolerance")]
    pub gap_tolerance: f64,

    pub rules: Vec<Rule>,
}

fn default_exact_fallback() -> bool {
    true
}

fn default_gap_tolerance() -> f64 {
    0.015
}

/// Non-fatal findings about a table's numeric ranges.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableWarning {
    /// Two rules of the same keyword set accept the same values.
    Overlap {
        keywords: String,
        measure: Measure,
        first_rule: usize,
        second_rule: usize,
    },
    /// Values between two neighbouring ranges are accepted by no rule.
    Gap {
        keywords: String,
        measure: Measure,
        after_rule: usize,
        before_rule: usize,
        from: f64,
        to: f64,
    },
}

impl fmt::Display for TableWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableWarning::Overlap {
                keywords,
                measure,
                first_rule,
                second_rule,
            } => write!(
                f,
                "[{}] {:?} ranges of rules #{} and #{} overlap",
                keywords, measure, first_rule, second_rule
            ),
            TableWarning::Gap {
                keywords,
                measure,
                after_rule,
                before_rule,
                from,
                to,
            } => write!(
                f,
                "[{}] {:?} values between {} and {} (rules #{} and #{}) match no rule",
                keywords, measure, from, to, after_rule, before_rule
            ),
        }
    }
}

impl RuleTable {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            ordering: RuleOrdering::default(),
            exact_keywords: BTreeSet::new(),
            exact_fallback: default_exact_fallback(),
            gap_tolerance: default_gap_tolerance(),
            rules,
        }
    }

    pub fn with_ordering(mut self, ordering: RuleOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_exact_keywords(mut self, keywords: &[&str]) -> Self {
        self.exact_keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn with_exact_fallback(mut self, fallback: bool) -> Self {
        self.exact_fallback = fallback;
        self
    }

    /// Parse a table without validating it.
    pub fn from_json(json: &str) -> Result<Self, RuleTableError> {
        serde_json::from_str(json).map_err(|e| RuleTableError::Parse(e.to_string()))
    }

    /// Read a table from a JSON file without validating it.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Parse and validate a table, logging its warnings.
    pub fn load(json: &str) -> Result<(Self, Vec<TableWarning>), RuleTableError> {
        let table = Self::from_json(json)?;
        let warnings = table.validate()?;

        for warning in &warnings {
            warn!("Rule table '{}': {}", table.name, warning);
        }
        debug!(
            "Loaded rule table '{}' with {} rules ({:?} ordering)",
            table.name,
            table.rules.len(),
            table.ordering
        );

        Ok((table, warnings))
    }

    /// Load and validate a table from a JSON file.
    pub fn load_file(path: &Path) -> crate::Result<(Self, Vec<TableWarning>)> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::load(&content)?)
    }

    /// The embedded default table.
    pub fn builtin() -> Result<Self, RuleTableError> {
        Self::load(BUILTIN_RULES).map(|(table, _)| table)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rules in priority order, paired with their 1-based authored position.
    pub fn ordered_rules(&self) -> Vec<(usize, &Rule)> {
        let mut ordered: Vec<(usize, &Rule)> = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (i + 1, rule))
            .collect();

        if self.ordering == RuleOrdering::KeywordLength {
            // stable: equal lengths keep authored order
            ordered.sort_by_key(|(_, rule)| std::cmp::Reverse(rule.specificity()));
        }

        ordered
    }

    /// Run every load-time check. Structural and ordering problems are
    /// errors; range overlaps and gaps are returned as warnings.
    pub fn validate(&self) -> Result<Vec<TableWarning>, RuleTableError> {
        self.check_structure()?;
        self.check_specificity()?;
        Ok(self.range_warnings())
    }

    fn check_structure(&self) -> Result<(), RuleTableError> {
        if self.rules.is_empty() {
            return Err(RuleTableError::Empty(self.name.clone()));
        }

        for (i, rule) in self.rules.iter().enumerate() {
            let number = i + 1;

            if rule.keywords.is_empty() {
                return Err(RuleTableError::NoKeywords { rule: number });
            }
            if rule.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(RuleTableError::BlankKeyword { rule: number });
            }

            if let Action::Dynamic(branches) = &rule.action {
                if branches.is_empty() {
                    return Err(RuleTableError::EmptyDynamic { rule: number });
                }
            }

            for target in rule.action.targets() {
                if target.subdir.trim().is_empty() {
                    return Err(RuleTableError::InvalidTarget {
                        rule: number,
                        reason: "empty subdirectory".to_string(),
                    });
                }
                let prefix = target.prefix.as_str();
                if prefix.is_empty() || prefix.contains(['/', '\\', '_']) {
                    return Err(RuleTableError::InvalidTarget {
                        rule: number,
                        reason: format!("invalid prefix '{}'", prefix),
                    });
                }
            }

            let branch_conditions = match &rule.action {
                Action::Static(_) => Vec::new(),
                Action::Dynamic(branches) => branches.iter().flat_map(|b| &b.when).collect(),
            };
            for condition in rule.predicate.iter().chain(branch_conditions) {
                check_condition(number, condition)?;
            }
        }

        Ok(())
    }

    /// No keyword may be checked before a more specific keyword containing it.
    /// A later rule that carries the general keyword itself is not shadowed.
    fn check_specificity(&self) -> Result<(), RuleTableError> {
        let ordered = self.ordered_rules();

        for (pos, (general_rule, general)) in ordered.iter().enumerate() {
            for (specific_rule, specific) in &ordered[pos + 1..] {
                for g in &general.keywords {
                    let g = g.to_lowercase();
                    if specific.keywords.iter().any(|k| k.to_lowercase() == g) {
                        continue;
                    }
                    for s in &specific.keywords {
                        let s = s.to_lowercase();
                        if s.len() > g.len() && s.contains(&g) {
                            return Err(RuleTableError::Specificity {
                                general: g,
                                general_rule: *general_rule,
                                specific: s,
                                specific_rule: *specific_rule,
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Overlaps and gaps among rules that share a keyword set and are gated
    /// by a single range on one measure.
    fn range_warnings(&self) -> Vec<TableWarning> {
        let mut groups: BTreeMap<(String, Measure), Vec<Interval>> = BTreeMap::new();

        for (i, rule) in self.rules.iter().enumerate() {
            if let Some((measure, interval)) = single_range(i + 1, rule) {
                groups
                    .entry((keyword_key(rule), measure))
                    .or_default()
                    .push(interval);
            }
        }

        let mut warnings = Vec::new();

        for ((keywords, measure), mut intervals) in groups {
            for (pos, a) in intervals.iter().enumerate() {
                for b in &intervals[pos + 1..] {
                    if a.intersects(b) {
                        warnings.push(TableWarning::Overlap {
                            keywords: keywords.clone(),
                            measure,
                            first_rule: a.rule,
                            second_rule: b.rule,
                        });
                    }
                }
            }

            intervals.sort_by(|a, b| a.lo.total_cmp(&b.lo));
            let mut reach = intervals[0];
            for next in &intervals[1..] {
                let width = next.lo - reach.hi;
                if width.is_finite() && width > self.gap_tolerance {
                    warnings.push(TableWarning::Gap {
                        keywords: keywords.clone(),
                        measure,
                        after_rule: reach.rule,
                        before_rule: next.rule,
                        from: reach.hi,
                        to: next.lo,
                    });
                }
                if next.hi > reach.hi {
                    reach = *next;
                }
            }
        }

        warnings
    }
}

fn check_condition(rule: usize, condition: &Condition) -> Result<(), RuleTableError> {
    match condition {
        Condition::Range { min, max, .. } => {
            if min.iter().chain(max.iter()).any(|v| !v.is_finite()) {
                return Err(RuleTableError::InvalidRange {
                    rule,
                    reason: "bound is not a finite number".to_string(),
                });
            }
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(RuleTableError::InvalidRange {
                        rule,
                        reason: format!("minimum {} is above maximum {}", min, max),
                    });
                }
            }
            Ok(())
        }
        Condition::Equals { value, .. } if !value.is_finite() => Err(RuleTableError::InvalidRange {
            rule,
            reason: "compared value is not a finite number".to_string(),
        }),
        _ => Ok(()),
    }
}

fn keyword_key(rule: &Rule) -> String {
    let keywords: BTreeSet<String> = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
    keywords.into_iter().collect::<Vec<_>>().join(" | ")
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    rule: usize,
    lo: f64,
    lo_inclusive: bool,
    hi: f64,
    hi_inclusive: bool,
}

impl Interval {
    fn intersects(&self, other: &Interval) -> bool {
        let (lo, lo_inclusive) = if self.lo > other.lo {
            (self.lo, self.lo_inclusive)
        } else if other.lo > self.lo {
            (other.lo, other.lo_inclusive)
        } else {
            (self.lo, self.lo_inclusive && other.lo_inclusive)
        };
        let (hi, hi_inclusive) = if self.hi < other.hi {
            (self.hi, self.hi_inclusive)
        } else if other.hi < self.hi {
            (other.hi, other.hi_inclusive)
        } else {
            (self.hi, self.hi_inclusive && other.hi_inclusive)
        };

        lo < hi || (lo == hi && lo_inclusive && hi_inclusive)
    }
}

/// The rule's only numeric range, ignoring presence and profile gates.
fn single_range(rule_number: usize, rule: &Rule) -> Option<(Measure, Interval)> {
    if rule
        .predicate
        .iter()
        .any(|c| matches!(c, Condition::Equals { .. }))
    {
        return None;
    }

    let mut ranges = rule.predicate.iter().filter_map(|c| match c {
        Condition::Range {
            measure,
            min,
            min_inclusive,
            max,
            max_inclusive,
        } => Some((
            *measure,
            Interval {
                rule: rule_number,
                lo: min.unwrap_or(f64::NEG_INFINITY),
                lo_inclusive: *min_inclusive,
                hi: max.unwrap_or(f64::INFINITY),
                hi_inclusive: *max_inclusive,
            },
        )),
        _ => None,
    });

    let first = ranges.next()?;
    match ranges.next() {
        Some(_) => None,
        None => Some(first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Target;
    use pretty_assertions::assert_eq;

    fn diameter_rule(keywords: &[&str], min: f64, max: f64, prefix: &str) -> Rule {
        Rule::new(
            keywords,
            vec![Condition::between(Measure::Diameter, min, max)],
            Action::Static(Target::new("05_DGB", prefix)),
        )
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let table = RuleTable::builtin().unwrap();
        assert_eq!(table.name, "esprit-default");
        assert_eq!(table.ordering, RuleOrdering::KeywordLength);
        assert!(table.exact_keywords.contains("reib mit o"));

        let warnings = table.validate().unwrap();
        assert!(warnings.iter().any(|w| matches!(
            w,
            TableWarning::Overlap { keywords, .. } if keywords == "passung fräsen"
        )));
    }

    #[test]
    fn test_builtin_rules_in_declaration_order_are_rejected() {
        // "bohrung" is authored before "bohrung passung"
        let table = RuleTable::builtin()
            .unwrap()
            .with_ordering(RuleOrdering::Declaration);

        let err = table.validate().unwrap_err();
        assert!(matches!(err, RuleTableError::Specificity { ref general, .. } if general == "bohrung"));
    }

    #[test]
    fn test_keyword_length_ordering_is_stable() {
        let table = RuleTable::new(
            "t",
            vec![
                diameter_rule(&["nuten"], 3.1, 4.0, "01"),
                diameter_rule(&["nuten rückzug"], 3.1, 4.0, "01"),
                diameter_rule(&["nuten"], 4.1, 6.0, "02"),
                diameter_rule(&["nuten rückzug"], 4.1, 6.0, "02"),
            ],
        );

        let order: Vec<usize> = table.ordered_rules().iter().map(|(n, _)| *n).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);

        let declared: Vec<usize> = table
            .clone()
            .with_ordering(RuleOrdering::Declaration)
            .ordered_rules()
            .iter()
            .map(|(n, _)| *n)
            .collect();
        assert_eq!(declared, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_specificity_violation() {
        let table = RuleTable::new(
            "t",
            vec![
                diameter_rule(&["nuten"], 3.1, 4.0, "01"),
                diameter_rule(&["nuten rückzug"], 3.1, 4.0, "01"),
            ],
        )
        .with_ordering(RuleOrdering::Declaration);

        assert_eq!(
            table.validate().unwrap_err(),
            RuleTableError::Specificity {
                general: "nuten".to_string(),
                general_rule: 1,
                specific: "nuten rückzug".to_string(),
                specific_rule: 2,
            }
        );
    }

    #[test]
    fn test_shared_general_keyword_is_not_shadowing() {
        let table = RuleTable::new(
            "t",
            vec![
                diameter_rule(&["gewinde m", "gewinde"], 2.0, 7.0, "03"),
                diameter_rule(&["gewinde m", "gewinde"], 7.01, 12.5, "04"),
            ],
        )
        .with_ordering(RuleOrdering::Declaration);

        assert!(table.validate().is_ok());

        let shadowed = RuleTable::new(
            "t",
            vec![
                diameter_rule(&["gewinde"], 2.0, 7.0, "03"),
                diameter_rule(&["gewinde m"], 7.01, 12.5, "04"),
            ],
        )
        .with_ordering(RuleOrdering::Declaration);

        assert!(matches!(
            shadowed.validate().unwrap_err(),
            RuleTableError::Specificity { general_rule: 1, specific_rule: 2, .. }
        ));
    }

    #[test]
    fn test_structure_errors() {
        let empty = RuleTable::new("empty", vec![]);
        assert_eq!(empty.validate().unwrap_err(), RuleTableError::Empty("empty".into()));

        let bad_prefix = RuleTable::new("t", vec![diameter_rule(&["bohrung"], 2.0, 3.0, "01_")]);
        assert!(matches!(
            bad_prefix.validate().unwrap_err(),
            RuleTableError::InvalidTarget { rule: 1, .. }
        ));

        let inverted = RuleTable::new("t", vec![diameter_rule(&["bohrung"], 5.0, 3.0, "01")]);
        assert!(matches!(
            inverted.validate().unwrap_err(),
            RuleTableError::InvalidRange { rule: 1, .. }
        ));

        let no_branches = RuleTable::new(
            "t",
            vec![Rule::new(&["wurm"], vec![], Action::Dynamic(vec![]))],
        );
        assert_eq!(
            no_branches.validate().unwrap_err(),
            RuleTableError::EmptyDynamic { rule: 1 }
        );

        let blank = RuleTable::new("t", vec![diameter_rule(&["  "], 2.0, 3.0, "01")]);
        assert_eq!(blank.validate().unwrap_err(), RuleTableError::BlankKeyword { rule: 1 });
    }

    #[test]
    fn test_overlap_and_gap_warnings() {
        let table = RuleTable::new(
            "t",
            vec![
                diameter_rule(&["passung fräsen"], 10.51, 14.5, "07"),
                diameter_rule(&["passung fräsen"], 14.51, 18.5, "08"),
                diameter_rule(&["passung fräsen"], 12.51, 23.5, "09"),
                diameter_rule(&["passung fräsen"], 25.0, 31.0, "10"),
            ],
        );

        let warnings = table.validate().unwrap();
        assert_eq!(
            warnings,
            vec![
                TableWarning::Overlap {
                    keywords: "passung fräsen".into(),
                    measure: Measure::Diameter,
                    first_rule: 1,
                    second_rule: 3,
                },
                TableWarning::Overlap {
                    keywords: "passung fräsen".into(),
                    measure: Measure::Diameter,
                    first_rule: 2,
                    second_rule: 3,
                },
                TableWarning::Gap {
                    keywords: "passung fräsen".into(),
                    measure: Measure::Diameter,
                    after_rule: 3,
                    before_rule: 4,
                    from: 23.5,
                    to: 25.0,
                },
            ]
        );
    }

    #[test]
    fn test_half_open_neighbours_do_not_overlap() {
        let table = RuleTable::new(
            "t",
            vec![
                Rule::new(
                    &["bohrung"],
                    vec![Condition::Range {
                        measure: Measure::Diameter,
                        min: Some(2.0),
                        min_inclusive: true,
                        max: Some(7.0),
                        max_inclusive: false,
                    }],
                    Action::Static(Target::new("05_DGB", "01")),
                ),
                diameter_rule(&["bohrung"], 7.0, 9.0, "03"),
            ],
        );

        assert!(table.validate().unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        assert!(matches!(
            RuleTable::load("{\"name\": \"x\"}"),
            Err(RuleTableError::Parse(_))
        ));
    }
}
