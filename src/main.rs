//! drawio-threagile CLI entry point.
//!
//! Converts a draw.io diagram into a Threagile YAML threat model and,
//! optionally, a Markdown threat report.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use drawio_threagile::application::validation::validate_model;
use drawio_threagile::application::{ConversionResult, Converter, ThreatReport};
use drawio_threagile::domain::ThreatCatalog;
use drawio_threagile::infra::app_config::{AppConfig, load_config, save_config};
use drawio_threagile::infra::yaml::{read_model, write_atomic, write_model};

#[derive(Parser, Debug)]
#[command(name = "drawio-threagile")]
#[command(version)]
#[command(about = "Convert draw.io diagrams into Threagile threat models", long_about = None)]
struct Args {
    /// draw.io file to convert
    #[arg(
        short,
        long,
        required_unless_present_any = ["dump_catalog", "check", "init_config"]
    )]
    input: Option<PathBuf>,

    /// Output YAML path (default: input path with a .yaml extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Check the diagram before mapping (overrides config)
    #[arg(long, value_name = "BOOL")]
    validate_input: Option<bool>,

    /// Check the produced model before writing it (overrides config)
    #[arg(long, value_name = "BOOL")]
    validate_output: Option<bool>,

    /// Also write a Markdown threat report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// TOML threat catalog replacing the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the threat catalog as JSON and exit
    #[arg(long)]
    dump_catalog: bool,

    /// Validate an existing Threagile YAML model and exit
    #[arg(long, value_name = "MODEL")]
    check: Option<PathBuf>,

    /// Write a configuration file with the default settings and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(args: Args) -> Result<ExitCode> {
    if let Some(path) = &args.init_config {
        save_config(&AppConfig::default(), path)?;
        log::info!("wrote default config to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(path) = &args.check {
        return check_model(path);
    }

    let config = load_config(args.config.as_deref())?;
    let catalog = load_catalog(args.catalog.as_deref().or(config.catalog_path.as_deref()))?;

    if args.dump_catalog {
        let json = serde_json::to_string_pretty(&catalog).context("serialize catalog")?;
        println!("{json}");
        return Ok(ExitCode::SUCCESS);
    }

    let input = args.input.context("--input is required")?;
    let output = args
        .output
        .unwrap_or_else(|| input.with_extension("yaml"));

    let mut options = config.conversion_options();
    if let Some(validate) = args.validate_input {
        options.validate_input = validate;
    }
    if let Some(validate) = args.validate_output {
        options.validate_output = validate;
    }

    log::info!("converting {}", input.display());
    let result = Converter::new(&catalog, options).convert_file(&input);
    report_issues(&result);

    let model = match (&result.model, result.success) {
        (Some(model), true) => model,
        _ => {
            log::error!("conversion failed, {} not written", output.display());
            return Ok(ExitCode::FAILURE);
        }
    };

    write_model(model, &output)?;
    log::info!("wrote {}", output.display());

    if let Some(report_path) = report_path(&args.report, &config, &output) {
        let markdown = ThreatReport::to_markdown(model, &result.findings, &catalog);
        write_atomic(&report_path, &markdown)?;
        log::info!("wrote threat report {}", report_path.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn check_model(path: &Path) -> Result<ExitCode> {
    let model = read_model(path).with_context(|| format!("load model {}", path.display()))?;
    let issues = validate_model(&model);
    let errors = issues.iter().filter(|issue| issue.is_blocking()).count();
    for issue in &issues {
        if issue.is_blocking() {
            log::error!("{issue}");
        } else {
            log::warn!("{issue}");
        }
    }
    log::info!(
        "{}: {} warnings, {} errors",
        path.display(),
        issues.len() - errors,
        errors
    );
    Ok(if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_catalog(path: Option<&Path>) -> Result<ThreatCatalog> {
    let Some(path) = path else {
        return Ok(ThreatCatalog::builtin());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read threat catalog {}", path.display()))?;
    let catalog = ThreatCatalog::from_toml_str(&contents)
        .with_context(|| format!("load threat catalog {}", path.display()))?;
    log::info!("loaded {} threats from {}", catalog.len(), path.display());
    Ok(catalog)
}

fn report_path(explicit: &Option<PathBuf>, config: &AppConfig, output: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.clone()),
        None if config.write_report => Some(output.with_extension("md")),
        None => None,
    }
}

fn report_issues(result: &ConversionResult) {
    for warning in &result.warnings {
        log::debug!("{warning}");
    }
    for error in &result.errors {
        log::error!("{error}");
    }
}
