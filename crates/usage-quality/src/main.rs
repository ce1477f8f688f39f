//! CLI entry point for the smartphone usage data quality engine.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use usage_quality::{
    ActionKind, Dataset, Pipeline, PipelineConfig, PipelineResult, ReportGenerator, RunReport,
    UnmappedGenderPolicy,
};

/// CLI-compatible unmapped gender policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliUnmappedGender {
    /// Drop rows whose gender is not Male or Female
    Drop,
    /// Replace unrecognized genders with "Unknown"
    Unknown,
    /// Keep unrecognized genders as normalized
    Keep,
}

impl From<CliUnmappedGender> for UnmappedGenderPolicy {
    fn from(cli: CliUnmappedGender) -> Self {
        match cli {
            CliUnmappedGender::Drop => UnmappedGenderPolicy::Drop,
            CliUnmappedGender::Unknown => UnmappedGenderPolicy::Unknown,
            CliUnmappedGender::Keep => UnmappedGenderPolicy::Keep,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Data quality engine for smartphone usage datasets",
    long_about = "Cleans smartphone usage records: normalizes fields, drops invalid rows,\n\
                  rejects IQR outliers and reconciles usage totals with their parts.\n\n\
                  EXAMPLES:\n  \
                  # Clean a file with default settings\n  \
                  usage-quality -i smartphone_usage.csv\n\n  \
                  # Looser outlier fences and a JSON report next to the output\n  \
                  usage-quality -i data.csv --iqr-multiplier 5 -r -o results/\n\n  \
                  # Machine-readable output\n  \
                  usage-quality -i data.csv --json | jq .rows_after"
)]
struct Args {
    /// Path to the CSV file to clean
    #[arg(short, long)]
    input: String,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses "<input_stem>_clean"
    #[arg(long)]
    output_name: Option<String>,

    /// JSON configuration file; CLI flags override its fields
    #[arg(long)]
    config: Option<String>,

    /// Multiplier k for the IQR outlier fences
    #[arg(long)]
    iqr_multiplier: Option<f64>,

    /// Keep duplicate rows
    #[arg(long)]
    no_dedup: bool,

    /// What to do with gender values other than Male/Female
    #[arg(long, value_enum)]
    unmapped_gender: Option<CliUnmappedGender>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,
}

/// Log filter from `RUST_LOG`, falling back to the CLI level.
fn log_filter(level: &str, quiet: bool) -> EnvFilter {
    let effective_level = if quiet { "warn" } else { level };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level))
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout carries only JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(level, quiet))
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    // .env must be loaded before the subscriber reads RUST_LOG
    dotenv().ok();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = load_config(&args)?;

    info!("Loading dataset from: {}", args.input);
    let raw = Dataset::from_csv(&args.input)?;
    info!("Dataset loaded: {} rows x {} columns", raw.height(), raw.width());

    let mut builder = Pipeline::builder().config(config);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    let result = match pipeline.run(&raw) {
        Ok(result) => result,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed: {}", e));
        }
    };

    handle_pipeline_output(&result, raw.width(), &args)
}

/// Start from `--config` (or defaults) and apply the individual CLI overrides.
fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => PipelineConfig::default(),
    };

    if let Some(k) = args.iqr_multiplier {
        config.iqr_multiplier = k;
    }
    if args.no_dedup {
        config.remove_duplicates = false;
    }
    if let Some(policy) = args.unmapped_gender {
        config.unmapped_gender = policy.into();
    }

    config.validate()?;
    Ok(config)
}

/// Handle pipeline output based on CLI flags.
///
/// - Default: print a human-readable summary to stdout
/// - `--json`: print the JSON report to stdout only
/// - `--emit-report`: also write the JSON report to a file
fn handle_pipeline_output(result: &PipelineResult, input_width: usize, args: &Args) -> Result<()> {
    let input_stem = extract_file_stem(&args.input);
    let output_name = args
        .output_name
        .clone()
        .unwrap_or_else(|| format!("{}_clean", input_stem));

    let generator = ReportGenerator::new(&args.output);
    let csv_path = generator.write_clean_csv(&result.dataset, &output_name)?;
    let csv_path = csv_path.to_string_lossy();

    let report = ReportGenerator::build_report(&args.input, Some(csv_path.as_ref()), result)?;

    if args.emit_report {
        let report_path = generator.write_report_to_file(&report, &input_stem)?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report, input_width, result.dataset.width());
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

/// Print a human-readable summary of the cleaning run.
///
/// Uses `println!` rather than tracing: this is the command's output, not a log.
fn print_human_readable_summary(report: &RunReport, input_width: usize, output_width: usize) {
    let cleaning = &report.cleaning;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file, report.rows_before, input_width
    );
    if let Some(ref output_file) = report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file, report.rows_after, output_width
        );
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", report.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed, {:.1}%)",
        report.rows_before, report.rows_after, report.rows_removed, report.removed_percentage
    );
    println!("  Rows repaired: {}", cleaning.total_repaired());
    println!();

    println!("Stages:");
    println!(
        "  {:<16} {:>10} {:>10} {:>10} {:>10}",
        "Stage", "Rows in", "Rows out", "Dropped", "Repaired"
    );
    println!("  {}", "-".repeat(60));
    for stage in cleaning.stages() {
        println!(
            "  {:<16} {:>10} {:>10} {:>10} {:>10}",
            stage.stage.display_name(),
            stage.rows_in,
            stage.rows_out,
            stage.rows_dropped,
            stage.rows_repaired
        );
    }
    println!();

    let entries: Vec<_> = cleaning
        .stages()
        .iter()
        .flat_map(|stage| stage.entries.iter())
        .collect();
    if !entries.is_empty() {
        println!("Rules Applied:");
        for entry in entries {
            let verb = match entry.rule.action() {
                ActionKind::Dropped => "dropped",
                ActionKind::Repaired => "repaired",
                ActionKind::Nulled => "nulled",
            };
            let column = entry.column.as_deref().unwrap_or("-");
            println!(
                "  - {:<22} {:<30} {:>6} {}",
                entry.rule.display_name(),
                column,
                entry.count,
                verb
            );
        }
        println!();
    }

    let insights = &report.summary.insights;
    if report.rows_after > 0 {
        println!("Key Insights:");
        println!("  Average age: {}", fmt_opt(insights.mean_age));
        println!(
            "  Average total app usage: {} hours",
            fmt_opt(insights.mean_total_app_usage)
        );
        println!(
            "  Average daily screen time: {} hours",
            fmt_opt(insights.mean_daily_screen_time)
        );
        println!(
            "  Average social media usage: {} hours",
            fmt_opt(insights.mean_social_media)
        );
        println!(
            "  Average productivity app usage: {} hours",
            fmt_opt(insights.mean_productivity)
        );
        println!("  Average gaming usage: {} hours", fmt_opt(insights.mean_gaming));
        println!("  Average apps used: {}", fmt_opt(insights.mean_apps_used));

        let notable: Vec<_> = report.summary.notable_correlations().collect();
        if !notable.is_empty() {
            println!();
            println!("Notable Correlations:");
            for c in notable {
                println!(
                    "  {} vs {}: {:.3} ({})",
                    c.left,
                    c.right,
                    c.coefficient,
                    c.describe()
                );
            }
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}
