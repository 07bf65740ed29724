//! Batch command - resolve many field files against one material root.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use procsel_core::{FieldParser, Resolution, ResolutionReport, Resolver};

use super::resolve::{describe_reason, read_fields};
use super::{build_resolver, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of field files (.json or recognized text)
    #[arg(required = true)]
    input: String,

    /// Material root directory or configured root name
    #[arg(short, long)]
    root: Option<String>,

    /// Rule table JSON file
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Profile to use instead of the root folder name
    #[arg(long)]
    profile: Option<String>,

    /// Output directory for per-file reports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of resolving a single file.
struct BatchResult {
    path: PathBuf,
    report: Option<ResolutionReport>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let resolver = Arc::new(build_resolver(
        &config,
        args.rules.as_deref(),
        args.profile.as_deref(),
    )?);
    let parser = Arc::new(config.field_parser());
    let root = Arc::new(config.root(args.root.as_deref())?);

    // Expand glob pattern
    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            matches!(ext.to_lowercase().as_str(), "json" | "txt")
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to resolve",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = semaphore.clone().acquire_owned().await?;
        let resolver = Arc::clone(&resolver);
        let parser = Arc::clone(&parser);
        let root = Arc::clone(&root);

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let outcome = resolve_file(&path, &resolver, &parser, &root);
            (path, outcome)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let (path, outcome) = handle.await?;

        match outcome {
            Ok(report) => results.push(BatchResult {
                path,
                report: Some(report),
                error: None,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to resolve {}: {}", path.display(), error_msg);
                    results.push(BatchResult {
                        path,
                        report: None,
                        error: Some(error_msg),
                    });
                } else {
                    error!("Failed to resolve {}: {}", path.display(), error_msg);
                    pb.abandon();
                    anyhow::bail!("Resolution failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if let Some(output_dir) = &args.output_dir {
        let mut used = HashSet::new();
        for result in &results {
            if let Some(report) = &result.report {
                let output_path = output_dir.join(report_file_name(&result.path, &mut used));
                fs::write(&output_path, serde_json::to_string_pretty(report)?)?;
                debug!("Wrote report to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let resolved = results
        .iter()
        .filter(|r| r.report.as_ref().is_some_and(|rep| rep.resolution.is_resolved()))
        .count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    let unmatched = results.len() - resolved - failed;

    println!();
    println!(
        "{} Resolved {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} resolved, {} without match, {} failed",
        style(resolved).green(),
        style(unmatched).yellow(),
        style(failed).red()
    );

    Ok(())
}

/// `a.json` -> `a.json.resolution.json`; repeated names from different
/// directories get a counter.
fn report_file_name(input: &Path, used: &mut HashSet<String>) -> String {
    let name = input
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fields".to_string());

    let mut candidate = format!("{}.resolution.json", name);
    let mut counter = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{}.{}.resolution.json", name, counter);
        counter += 1;
    }
    candidate
}

fn resolve_file(
    path: &Path,
    resolver: &Resolver,
    parser: &FieldParser,
    root: &Path,
) -> anyhow::Result<ResolutionReport> {
    let fields = read_fields(path, parser)?;
    Ok(resolver.evaluate_with_report(&fields, root))
}

fn write_summary(path: &Path, results: &[BatchResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "feature_type",
        "rule",
        "path",
        "reason",
        "processing_time_ms",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &result.report {
            Some(report) => {
                let feature = report.feature_type.as_deref().unwrap_or("");
                let elapsed = report.elapsed_ms.to_string();
                match &report.resolution {
                    Resolution::Resolved(file) => wtr.write_record([
                        filename,
                        "resolved",
                        feature,
                        &file.rule.to_string(),
                        &file.path.display().to_string(),
                        "",
                        &elapsed,
                    ])?,
                    Resolution::NoMatch { reason } => wtr.write_record([
                        filename,
                        "no_match",
                        feature,
                        "",
                        "",
                        &describe_reason(reason),
                        &elapsed,
                    ])?,
                }
            }
            None => wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                result.error.as_deref().unwrap_or(""),
                "",
            ])?,
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_names_keep_extension_and_stay_unique() {
        let mut used = HashSet::new();
        assert_eq!(report_file_name(Path::new("in/a.json"), &mut used), "a.json.resolution.json");
        assert_eq!(report_file_name(Path::new("in/a.txt"), &mut used), "a.txt.resolution.json");
        assert_eq!(
            report_file_name(Path::new("other/a.json"), &mut used),
            "a.json.2.resolution.json"
        );
    }
}
