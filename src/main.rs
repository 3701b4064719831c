//! Zentinel CAS ticket validation tool.
//!
//! Validates one service ticket against a CAS server using the same code
//! path as the agent and prints the outcome as JSON.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};

use zentinel_agent_cas::{CasConfig, CasConfigJson, ProtocolVersion, TicketValidator};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "zentinel-cas-agent")]
#[command(about = "Validate a CAS service ticket")]
struct Args {
    /// CAS server base URL
    #[arg(long, env = "CAS_URL")]
    cas_url: Option<String>,

    /// Externally visible service URL
    #[arg(long, env = "CAS_SERVICE_URL")]
    service_url: Option<String>,

    /// Protocol version (1.0, 2.0, 3.0, saml1.1)
    #[arg(long, default_value = "3.0", env = "CAS_VERSION")]
    cas_version: String,

    /// JSON configuration file, applied on top of the flags
    #[arg(long, env = "CAS_CONFIG")]
    config: Option<PathBuf>,

    /// Bound on the validation request in seconds
    #[arg(long, env = "CAS_VALIDATION_TIMEOUT")]
    timeout_secs: Option<u64>,

    /// Request path the ticket was issued for
    #[arg(long, default_value = "/")]
    path: String,

    /// Service ticket to validate
    #[arg(long)]
    ticket: String,

    /// Enable verbose logging
    #[arg(short, long, env = "CAS_VERBOSE")]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<CasConfig> {
    let cas_version: ProtocolVersion = args.cas_version.parse().map_err(|e: String| anyhow!(e))?;

    let mut config = CasConfig {
        cas_url: args.cas_url.clone().unwrap_or_default(),
        service_url: args.service_url.clone().unwrap_or_default(),
        cas_version,
        validation_timeout_secs: args.timeout_secs,
        ..Default::default()
    };

    if let Some(ref path) = args.config {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let json: CasConfigJson = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        json.apply_to(&mut config).map_err(|e| anyhow!(e))?;
        debug!(path = ?path, "Applied JSON configuration");
    }

    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "{}={},zentinel_agent_cas={}",
            env!("CARGO_CRATE_NAME"),
            log_level,
            log_level
        ))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = build_config(&args)?;

    info!(
        cas_url = %config.cas_url,
        version = %config.cas_version,
        "Configuration loaded"
    );

    let validator = TicketValidator::new(&config)?;
    let service_url = format!("{}{}", config.service_base(), args.path);

    let outcome = validator.validate(&args.ticket, &service_url).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
    );

    if !outcome.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
