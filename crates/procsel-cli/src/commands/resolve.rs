//! Resolve command - select the process file for a single feature.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;
use console::style;
use tracing::{debug, info};

use procsel_core::resolver::{NoMatchReason, ResolutionReport, RuleStep, StepOutcome};
use procsel_core::{ExtractedFields, FieldName, FieldParser, Resolution};

use super::{build_resolver, load_config};

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Field file: JSON object, recognized panel text, or `-` for stdin
    input: Option<PathBuf>,

    /// Set a field, e.g. -f "Feature-Typ=Bohrung" (overrides the input)
    #[arg(short = 'f', long = "field", value_name = "KEY=VALUE", value_parser = parse_field_arg)]
    fields: Vec<(FieldName, String)>,

    /// Material root directory or configured root name
    #[arg(short, long)]
    root: Option<String>,

    /// Rule table JSON file
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Profile to use instead of the root folder name
    #[arg(long)]
    profile: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Show every rule that was considered
    #[arg(long)]
    explain: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text
    Text,
}

pub async fn run(args: ResolveArgs, config_path: Option<&str>) -> anyhow::Result<ExitCode> {
    let config = load_config(config_path)?;
    let resolver = build_resolver(&config, args.rules.as_deref(), args.profile.as_deref())?;
    let root = config.root(args.root.as_deref())?;

    let mut fields = match &args.input {
        Some(input) => read_fields(input, &config.field_parser())?,
        None => ExtractedFields::new(),
    };
    for (field, value) in &args.fields {
        fields.set(*field, value.clone());
    }

    if fields.is_empty() {
        anyhow::bail!("No fields given. Pass an input file or -f KEY=VALUE.");
    }

    info!("Resolving against {}", root.display());
    let report = resolver.evaluate_with_report(&fields, &root);
    debug!("Resolution took {}ms", report.elapsed_ms);

    match args.format {
        OutputFormat::Json => {
            let json = if args.explain {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string_pretty(&report.resolution)?
            };
            println!("{}", json);
        }
        OutputFormat::Text => print_text(&report, args.explain),
    }

    Ok(match report.resolution {
        Resolution::Resolved(_) => ExitCode::SUCCESS,
        Resolution::NoMatch { .. } => ExitCode::from(2),
    })
}

/// Read fields from a JSON object or recognized panel text.
pub fn read_fields(input: &Path, parser: &FieldParser) -> anyhow::Result<ExtractedFields> {
    let content = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        std::fs::read_to_string(input)?
    };

    if content.trim_start().starts_with('{') {
        Ok(ExtractedFields::from_json(&content)?)
    } else {
        Ok(parser.parse(&content))
    }
}

fn parse_field_arg(s: &str) -> Result<(FieldName, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    Ok((key.parse()?, value.trim().to_string()))
}

pub fn describe_reason(reason: &NoMatchReason) -> String {
    match reason {
        NoMatchReason::InvalidInput(message) => format!("invalid input ({})", message),
        NoMatchReason::NoKeywordMatch => "no rule matches the feature type".to_string(),
        NoMatchReason::AllDeclined => "no rule accepts the measurements".to_string(),
        NoMatchReason::DirectoriesMissing => "target directories do not exist".to_string(),
        NoMatchReason::NoMatchingFile => "no file with the target prefix".to_string(),
    }
}

fn print_text(report: &ResolutionReport, explain: bool) {
    if explain {
        eprintln!(
            "{} Feature: {}  Profile: {}",
            style("ℹ").blue(),
            report.feature_type.as_deref().unwrap_or("-"),
            report.profile.as_deref().unwrap_or("-")
        );
        for step in &report.steps {
            eprintln!("  {}", format_step(step));
        }
    }

    match &report.resolution {
        Resolution::Resolved(file) => {
            println!("{}", file.path.display());
            if explain {
                eprintln!(
                    "{} Rule #{} [{}] -> {}",
                    style("✓").green(),
                    file.rule,
                    file.keywords.join(" | "),
                    file.target
                );
            }
        }
        Resolution::NoMatch { reason } => {
            eprintln!(
                "{} No process file found: {}",
                style("ℹ").blue(),
                describe_reason(reason)
            );
        }
    }
}

fn format_step(step: &RuleStep) -> String {
    let outcome = match &step.outcome {
        StepOutcome::PredicateFailed => style("predicate not met".to_string()).dim(),
        StepOutcome::Declined => style("no branch applies".to_string()).dim(),
        StepOutcome::DirectoryMissing { dir } => {
            style(format!("missing directory {}", dir.display())).yellow()
        }
        StepOutcome::DirectoryUnreadable { dir, error } => {
            style(format!("cannot read {}: {}", dir.display(), error)).yellow()
        }
        StepOutcome::NoMatchingFile { dir, prefix } => {
            style(format!("no {}_*.prc in {}", prefix, dir.display())).yellow()
        }
        StepOutcome::Resolved { path } => style(format!("selected {}", path.display())).green(),
    };

    format!(
        "#{:<3} {:<24} {}",
        step.rule,
        step.keywords.join(" | "),
        outcome
    )
}
