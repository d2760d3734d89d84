//! Command-line entry point for the pythia analysis engine.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pythia_rs::core::config::AnalyzerKind;
use pythia_rs::io::reports::ReportFormat;
use pythia_rs::{PythiaConfig, PythiaEngine};

/// Multi-principle code quality analysis for Python source.
#[derive(Debug, Parser)]
#[command(name = "pythia", version, about)]
struct Args {
    /// File or directory to analyze
    path: PathBuf,

    /// Report format: text, json, or html
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fan directory analysis out to a worker pool. Duplication analysis
    /// still runs sequentially so cross-file duplicate detection stays
    /// complete.
    #[arg(long)]
    parallel: bool,

    /// Analyzers to run, in order (srp, ocp, lsp, isp, dip, kiss, dry)
    #[arg(long, value_delimiter = ',')]
    analyzers: Vec<String>,

    /// Enable the persistent result cache
    #[arg(long)]
    use_cache: bool,

    /// Directory for cache entries
    #[arg(long, default_value = ".pythia_cache")]
    cache_dir: PathBuf,

    /// Verbose logging (repeat for debug output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = build_config(&args)?;
    let format = ReportFormat::from_str(&args.format)?;

    let mut engine = PythiaEngine::new(config).context("failed to build analysis engine")?;
    if args.path.is_dir() {
        engine
            .analyze_directory(&args.path, args.parallel)
            .with_context(|| format!("failed to analyze {}", args.path.display()))?;
    } else {
        engine.analyze_file(&args.path)?;
    }

    let report = engine.generate_report(format, args.output.as_deref())?;
    if args.output.is_none() {
        println!("{report}");
    }
    Ok(())
}

fn build_config(args: &Args) -> Result<PythiaConfig> {
    let mut config = PythiaConfig {
        use_cache: args.use_cache,
        cache_dir: args.cache_dir.clone(),
        ..PythiaConfig::default()
    };

    if !args.analyzers.is_empty() {
        let mut enabled = Vec::new();
        for key in &args.analyzers {
            match AnalyzerKind::from_key(&key.to_ascii_lowercase()) {
                Some(kind) => enabled.push(kind),
                None => bail!("unknown analyzer '{key}' (expected srp, ocp, lsp, isp, dip, kiss, or dry)"),
            }
        }
        config.enabled_analyzers = enabled;
    }

    Ok(config)
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
