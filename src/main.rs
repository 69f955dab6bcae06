use anyhow::Result;
use clap::Parser;
use tracing::{error, warn};

use refactor_first::cli::{Cli, Commands};
use refactor_first::config::{Config, ConfigService};
use refactor_first::doctor;
use refactor_first::error::RankError;
use refactor_first::service::{AppService, RankParams};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        log_failure(&e);
        println!("{}", make_error_line(&e));
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn classify_error(e: &anyhow::Error) -> (String, String) {
    if let Some(re) = e.downcast_ref::<RankError>() {
        (re.code.to_string(), re.message.clone())
    } else {
        ("IO_ERROR".to_string(), format!("{e:#}"))
    }
}

/// Unusable input is the caller's problem; anything else is a failed run.
fn log_failure(e: &anyhow::Error) {
    match e.downcast_ref::<RankError>() {
        Some(re) if re.code.is_input_error() => {
            warn!(code = %re.code, message = %re.message, "input rejected");
        }
        Some(re) => error!(code = %re.code, message = %re.message, "run failed"),
        None => error!(error = %format!("{e:#}"), "run failed"),
    }
}

fn serialize_output(value: &impl serde::Serialize, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

fn make_error_line(e: &anyhow::Error) -> String {
    let (code, message) = classify_error(e);
    let obj = serde_json::json!({ "error": { "code": code, "message": message } });
    obj.to_string()
}

/// Threshold flags given on the command line win over the config file.
fn apply_overrides(
    config: &mut Config,
    wmc: Option<u32>,
    atfd: Option<u32>,
    tcc: Option<f64>,
) {
    if let Some(wmc) = wmc {
        config.thresholds.wmc = wmc;
    }
    if let Some(atfd) = atfd {
        config.thresholds.atfd = atfd;
    }
    if let Some(tcc) = tcc {
        config.thresholds.tcc = tcc;
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

fn run(cli: Cli) -> Result<()> {
    let pretty = cli.pretty;

    // Load configuration
    let mut config = ConfigService::load(cli.config.as_deref())?;

    // Initialize logging if debug mode (CLI flag or config)
    if cli.debug || config.debug {
        refactor_first::logger::init(&config)?;
    }

    match cli.command {
        Commands::Init { path } => {
            let config_path = match path {
                Some(p) => {
                    ConfigService::generate_at(&p)?;
                    p
                }
                None => ConfigService::generate_default()?,
            };
            eprintln!("Configuration file created at: {}", config_path.display());
            Ok(())
        }
        Commands::Doctor { dir } => cmd_doctor(&config, dir.as_deref(), pretty),
        Commands::Rank {
            dir,
            metrics,
            details,
            limit,
            wmc_threshold,
            atfd_threshold,
            tcc_threshold,
        } => {
            apply_overrides(&mut config, wmc_threshold, atfd_threshold, tcc_threshold);
            let service = AppService::new(config);
            let params = RankParams {
                dir: &dir,
                metrics: metrics.as_deref(),
                details,
                limit,
            };
            cmd_rank(&service, &params, pretty)
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_rank(service: &AppService, params: &RankParams<'_>, pretty: bool) -> Result<()> {
    let response = service.rank(params)?;
    let output = serialize_output(&response, pretty)?;
    println!("{output}");
    Ok(())
}

fn cmd_doctor(config: &Config, dir: Option<&str>, pretty: bool) -> Result<()> {
    let report = doctor::run_doctor(&config.history, dir);
    let output = serialize_output(&report, pretty)?;
    println!("{output}");
    Ok(())
}
