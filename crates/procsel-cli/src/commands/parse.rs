//! Parse command - turn recognized panel text into a field map.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::warn;

use super::load_config;

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Recognized panel text
    #[arg(required = true)]
    input: PathBuf,

    /// Text of a second recognition pass, used to correct a misread
    /// bounding-box length
    #[arg(long)]
    second_pass: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let parser = config.field_parser();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let text = fs::read_to_string(&args.input)?;
    let mut fields = parser.parse(&text);

    if parser.needs_correction(&fields) {
        match &args.second_pass {
            Some(path) => {
                let second = fs::read_to_string(path)?;
                if !parser.correct_suspicious(&mut fields, &second) {
                    warn!("Second pass did not yield a different bounding-box length");
                }
            }
            None => warn!(
                "Bounding-box length '{}' is a likely misread; pass --second-pass to correct it",
                config.parser.suspicious_bbox_length
            ),
        }
    }

    let json = serde_json::to_string_pretty(&fields)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &json)?;
        println!(
            "{} Fields written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", json);
    }

    Ok(())
}
