//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod parse;
pub mod resolve;
pub mod rules;

use std::path::{Path, PathBuf};

use tracing::debug;

use procsel_core::{ProcselConfig, Resolver, RuleTable};

/// `~/.config/procsel/config.json` or the platform equivalent.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("procsel")
        .join("config.json")
}

/// Configuration from `--config`, else the default file, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ProcselConfig> {
    if let Some(path) = config_path {
        return Ok(ProcselConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using configuration from {}", default_path.display());
        Ok(ProcselConfig::from_file(&default_path)?)
    } else {
        Ok(ProcselConfig::default())
    }
}

/// Rule table from `--rules`, falling back to the configured one.
pub fn load_table(config: &ProcselConfig, rules: Option<&Path>) -> anyhow::Result<RuleTable> {
    match rules {
        Some(path) => {
            let (table, _) = RuleTable::load_file(path)?;
            Ok(table)
        }
        None => Ok(config.load_rules()?),
    }
}

/// Resolver honouring `--rules` and `--profile` over the configuration.
pub fn build_resolver(
    config: &ProcselConfig,
    rules: Option<&Path>,
    profile: Option<&str>,
) -> anyhow::Result<Resolver> {
    let resolver = Resolver::new(load_table(config, rules)?)?;

    Ok(match profile.or(config.resolver.profile.as_deref()) {
        Some(profile) => resolver.with_profile(profile),
        None => resolver,
    })
}
