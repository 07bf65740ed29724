//! Configuration for resolving process files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProcselError;
use crate::fields::FieldParser;
use crate::resolver::Resolver;
use crate::rules::RuleTable;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcselConfig {
    /// Rule table and profile selection.
    pub resolver: ResolverConfig,

    /// Known material roots.
    pub roots: RootsConfig,

    /// OCR text parsing.
    pub parser: ParserConfig,
}

/// Rule table and profile selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// JSON rule table; the embedded table when unset.
    pub rules_file: Option<PathBuf>,

    /// Fixed profile instead of the root folder name.
    pub profile: Option<String>,
}

/// Named material roots, e.g. `"1.2379" -> /mnt/Prozesse/1.2379`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootsConfig {
    pub paths: BTreeMap<String, PathBuf>,

    /// Root used when none is given.
    pub default_root: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Bounding box length that triggers a second recognition pass.
    pub suspicious_bbox_length: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            suspicious_bbox_length: crate::fields::SUSPICIOUS_BBOX_LENGTH.to_string(),
        }
    }
}

impl ProcselConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| ProcselError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Configured rule table, or the embedded one.
    pub fn load_rules(&self) -> crate::Result<RuleTable> {
        match &self.resolver.rules_file {
            Some(path) => {
                debug!("Loading rule table from {}", path.display());
                let (table, _) = RuleTable::load_file(path)?;
                Ok(table)
            }
            None => Ok(RuleTable::builtin()?),
        }
    }

    /// Resolver over the configured table and profile.
    pub fn resolver(&self) -> crate::Result<Resolver> {
        let resolver = Resolver::new(self.load_rules()?)?;
        Ok(match &self.resolver.profile {
            Some(profile) => resolver.with_profile(profile),
            None => resolver,
        })
    }

    pub fn field_parser(&self) -> FieldParser {
        FieldParser::new().with_suspicious_bbox_length(self.parser.suspicious_bbox_length.clone())
    }

    /// Resolve a root argument: a configured name, otherwise a path.
    /// Without an argument the default root is used.
    pub fn root(&self, name_or_path: Option<&str>) -> crate::Result<PathBuf> {
        let name = match name_or_path {
            Some(name) => name,
            None => self
                .roots
                .default_root
                .as_deref()
                .ok_or_else(|| ProcselError::Config("no material root given and no default_root configured".to_string()))?,
        };

        Ok(self
            .roots
            .paths
            .get(name)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"resolver": {"profile": "kulissen-2025"}}"#).unwrap();

        let config = ProcselConfig::from_file(&path).unwrap();
        assert_eq!(config.resolver.profile.as_deref(), Some("kulissen-2025"));
        assert_eq!(config.resolver.rules_file, None);
        assert_eq!(config.parser, ParserConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ProcselConfig::default();
        config.roots.paths.insert("1.2379".into(), PathBuf::from("/mnt/Prozesse/1.2379"));
        config.roots.default_root = Some("1.2379".into());
        config.save(&path).unwrap();

        assert_eq!(ProcselConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(ProcselConfig::from_file(&path), Err(ProcselError::Config(_))));
    }

    #[test]
    fn test_root_lookup() {
        let mut config = ProcselConfig::default();
        assert!(config.root(None).is_err());
        assert_eq!(config.root(Some("/tmp/x")).unwrap(), PathBuf::from("/tmp/x"));

        config.roots.paths.insert("kulissen".into(), PathBuf::from("/mnt/Kulissen-2025"));
        config.roots.default_root = Some("kulissen".into());
        assert_eq!(config.root(None).unwrap(), PathBuf::from("/mnt/Kulissen-2025"));
        assert_eq!(config.root(Some("kulissen")).unwrap(), PathBuf::from("/mnt/Kulissen-2025"));
    }

    #[test]
    fn test_resolver_from_rules_file() {
        let dir = TempDir::new().unwrap();
        let rules = dir.path().join("rules.json");
        std::fs::write(
            &rules,
            r#"{"name": "small", "rules": [
                {"keywords": ["bohrung"], "action": {"static": {"subdir": "05_DGB", "prefix": "02"}}}
            ]}"#,
        )
        .unwrap();

        let mut config = ProcselConfig::default();
        config.resolver.rules_file = Some(rules);
        let resolver = config.resolver().unwrap();
        assert_eq!(resolver.table_name(), "small");
        assert_eq!(resolver.rules().count(), 1);

        config.resolver.rules_file = Some(dir.path().join("missing.json"));
        assert!(matches!(config.resolver(), Err(ProcselError::Io(_))));
    }
}
