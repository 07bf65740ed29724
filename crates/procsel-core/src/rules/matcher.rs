//! Keyword eligibility: does a feature type select a rule?

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace, warn};

/// How a keyword matched the feature type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Whole-word match.
    Exact,
    /// Substring match after an exact-mode rule found no whole word.
    ExactFallback,
    /// Plain substring match.
    Substring,
}

/// The keyword that made a rule eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordHit {
    pub keyword: String,
    pub mode: MatchMode,
}

/// Matches rule keywords against a lower-cased feature type.
///
/// Rules holding a keyword from the exact set are matched on word
/// boundaries; every other rule uses substring containment.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    /// Whole-word patterns keyed by lower-cased exact keyword.
    exact: BTreeMap<String, Regex>,
    fallback: bool,
}

impl KeywordMatcher {
    pub fn new<I, S>(exact_keywords: I, fallback: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exact = exact_keywords
            .into_iter()
            .filter_map(|k| {
                let keyword = k.as_ref().to_lowercase();
                match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&keyword))) {
                    Ok(re) => Some((keyword, re)),
                    Err(e) => {
                        warn!("Exact keyword '{}' ignored: {}", keyword, e);
                        None
                    }
                }
            })
            .collect();

        Self { exact, fallback }
    }

    /// Whether a rule with these keywords uses whole-word matching.
    pub fn is_exact(&self, keywords: &[String]) -> bool {
        keywords
            .iter()
            .any(|k| self.exact.contains_key(&k.to_lowercase()))
    }

    /// First keyword that matches, or `None` if the rule is not eligible.
    ///
    /// In exact mode only the rule's exact keywords are tried as whole
    /// words; the substring fallback considers all of its keywords.
    pub fn matches(&self, feature: &str, keywords: &[String]) -> Option<KeywordHit> {
        let feature = feature.to_lowercase();

        if self.is_exact(keywords) {
            let whole_word = keywords.iter().find(|kw| {
                self.exact
                    .get(&kw.to_lowercase())
                    .is_some_and(|re| re.is_match(&feature))
            });
            if let Some(kw) = whole_word {
                debug!("Exact match: '{}' in '{}'", kw, feature);
                return Some(hit(kw, MatchMode::Exact));
            }

            if self.fallback {
                if let Some(kw) = keywords.iter().find(|kw| substring_match(&feature, kw)) {
                    debug!("Exact fallback match: '{}' in '{}'", kw, feature);
                    return Some(hit(kw, MatchMode::ExactFallback));
                }
            }

            trace!("No exact keyword of {:?} in '{}'", keywords, feature);
            return None;
        }

        let found = keywords.iter().find(|kw| substring_match(&feature, kw));
        match found {
            Some(kw) => {
                debug!("Substring match: '{}' in '{}'", kw, feature);
                Some(hit(kw, MatchMode::Substring))
            }
            None => {
                trace!("No keyword of {:?} in '{}'", keywords, feature);
                None
            }
        }
    }
}

fn hit(keyword: &str, mode: MatchMode) -> KeywordHit {
    KeywordHit {
        keyword: keyword.to_string(),
        mode,
    }
}

fn substring_match(feature: &str, keyword: &str) -> bool {
    feature.contains(&keyword.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn matcher(fallback: bool) -> KeywordMatcher {
        KeywordMatcher::new(["reib mit o", "reib ohne o"], fallback)
    }

    #[test]
    fn test_exact_gating() {
        let m = matcher(true);

        assert!(m.matches("reib mit o", &kw(&["reib mit o"])).is_some());
        assert!(m.matches("reib mit o", &kw(&["reib ohne o"])).is_none());
        assert!(m.matches("reib ohne o", &kw(&["reib ohne o"])).is_some());
        assert!(m.matches("reib ohne o", &kw(&["reib mit o"])).is_none());
    }

    #[test]
    fn test_exact_mode_reports_whole_word() {
        let m = matcher(false);
        let hit = m.matches("Reib mit O 8H7", &kw(&["reib mit o"])).unwrap();
        assert_eq!(hit.mode, MatchMode::Exact);
        assert_eq!(hit.keyword, "reib mit o");
    }

    #[test]
    fn test_exact_fallback_to_substring() {
        // "reib mit o" only occurs inside a longer word here
        let feature = "reib mit oel";

        assert!(matcher(false).matches(feature, &kw(&["reib mit o"])).is_none());

        let hit = matcher(true).matches(feature, &kw(&["reib mit o"])).unwrap();
        assert_eq!(hit.mode, MatchMode::ExactFallback);
    }

    #[test]
    fn test_exact_patterns_compiled_once_per_keyword() {
        let m = KeywordMatcher::new(["Reib mit O", "reib mit o", "reib ohne o"], false);
        assert_eq!(m.exact.len(), 2);
        assert!(m.is_exact(&kw(&["REIB MIT O"])));
        assert!(m.matches("Reib mit O 8H7", &kw(&["REIB MIT O"])).is_some());
    }

    #[test]
    fn test_substring_mode() {
        let m = matcher(true);
        let hit = m.matches("nuten rückzug bbox=5.0", &kw(&["nuten"])).unwrap();
        assert_eq!(hit.mode, MatchMode::Substring);
        assert!(m.matches("Bohrung KM", &kw(&["bohrung km"])).is_some());
        assert!(m.matches("gewinde", &kw(&["gewinde m", "gewinde"])).is_some());
        assert!(m.matches("tasche", &kw(&["nuten"])).is_none());
    }
}
