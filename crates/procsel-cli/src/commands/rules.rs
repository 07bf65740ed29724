//! Rules command - inspect, export and validate rule tables.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Subcommand};
use console::style;

use procsel_core::{Action, Rule, RuleTable};

use super::{load_config, load_table};

/// Arguments for the rules command.
#[derive(Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    command: RulesCommand,
}

#[derive(Subcommand)]
enum RulesCommand {
    /// List rules in priority order
    Show {
        /// Rule table JSON file
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Write the rule table as JSON
    Export {
        /// Rule table JSON file
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a rule table for errors and range warnings
    Validate {
        /// Rule table JSON file
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

pub async fn run(args: RulesArgs, config_path: Option<&str>) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;

    match args.command {
        RulesCommand::Show { rules } => {
            let table = load_table(&config, rules.as_deref())?;
            show_rules(&table);
        }
        RulesCommand::Export { rules, output } => {
            let table = load_table(&config, rules.as_deref())?;
            let json = table.to_json_pretty()?;
            match output {
                Some(path) => {
                    fs::write(&path, json)?;
                    println!(
                        "{} Rule table written to {}",
                        style("✓").green(),
                        path.display()
                    );
                }
                None => println!("{}", json),
            }
        }
        RulesCommand::Validate { rules } => return validate(&config, rules),
    }

    Ok(ExitCode::SUCCESS)
}

fn show_rules(table: &RuleTable) {
    println!(
        "{} ({} rules, {:?} ordering)",
        style(&table.name).bold(),
        table.rules.len(),
        table.ordering
    );
    println!();

    for (number, rule) in table.ordered_rules() {
        println!("#{:<3} {}", number, format_rule(rule));
    }
}

fn format_rule(rule: &Rule) -> String {
    let predicate = if rule.predicate.is_empty() {
        "always".to_string()
    } else {
        rule.predicate
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" and ")
    };

    let action = match &rule.action {
        Action::Static(target) => target.to_string(),
        Action::Dynamic(branches) => format!("one of {} branches", branches.len()),
    };

    format!(
        "{:<24} {} -> {}",
        style(rule.keyword_label()).cyan(),
        predicate,
        action
    )
}

fn validate(
    config: &procsel_core::ProcselConfig,
    rules: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let table = match &rules {
        Some(path) => RuleTable::from_file(path)?,
        None => match &config.resolver.rules_file {
            Some(path) => RuleTable::from_file(path)?,
            None => RuleTable::from_json(procsel_core::rules::BUILTIN_RULES)?,
        },
    };

    match table.validate() {
        Ok(warnings) => {
            for warning in &warnings {
                println!("{} {}", style("⚠").yellow(), warning);
            }
            println!(
                "{} Rule table '{}' is valid ({} rules, {} warnings)",
                style("✓").green(),
                table.name,
                table.rules.len(),
                warnings.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} {}", style("✗").red(), e);
            Ok(ExitCode::FAILURE)
        }
    }
}
