//! # Command Line Interface
//!
//! `certinject inject <FILE>`, `certinject clean` and
//! `certinject fingerprint <FILE>`.

pub mod output;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::certificate::Certificate;
use crate::config::{InjectConfig, ObservabilityConfig};
use crate::observability::{init_logging, log_config_info};
use crate::stores::{TrustStoreDispatcher, TrustStoreType};

use output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "certinject")]
#[command(about = "Inject TLS certificates into OS trust stores and sweep stale ones")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Trust store to use (repeatable); overrides the configured stores
    #[arg(long = "store", global = true)]
    pub stores: Vec<TrustStoreType>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inject a certificate (DER or PEM) into the enabled stores
    Inject {
        /// Certificate file
        file: PathBuf,
    },

    /// Remove stale injected certificates from the enabled stores
    Clean,

    /// Print the identifiers of a certificate
    Fingerprint {
        /// Certificate file
        file: PathBuf,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        output: String,
    },
}

/// Identifiers of a certificate as shown by `fingerprint`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintReport {
    pub sha1: String,
    pub sha1_colons: String,
    pub sha256: String,
    pub subject: Option<String>,
    /// Registry key name used by the CryptoAPI store
    pub registry_key: String,
    /// Nickname used by the NSS store
    pub nss_nickname: String,
}

impl FingerprintReport {
    pub fn new(cert: &Certificate) -> Self {
        let sha256 = cert.sha256_hex();
        Self {
            sha1: cert.fingerprint_hex(),
            sha1_colons: cert.fingerprint_colons(),
            registry_key: cert.fingerprint_hex().to_uppercase(),
            nss_nickname: crate::stores::nss::nickname_from_fingerprint_hex(&sha256),
            sha256,
            subject: cert.subject(),
        }
    }

    pub fn to_text(&self) -> String {
        output::key_value_lines(&[
            ("Subject", self.subject.as_deref().unwrap_or("-")),
            ("SHA-1", &self.sha1),
            ("SHA-1 (colons)", &self.sha1_colons),
            ("SHA-256", &self.sha256),
            ("Registry key", &self.registry_key),
            ("NSS nickname", &self.nss_nickname),
        ])
    }
}

/// Run CLI commands
pub fn run_cli() -> anyhow::Result<()> {
    execute(Cli::parse())
}

/// Execute parsed CLI arguments
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fingerprint { ref file, ref output } => {
            init_logging(&ObservabilityConfig::default(), cli.verbose);
            handle_fingerprint(file, output)
        }
        Commands::Inject { ref file } => {
            let dispatcher = build_dispatcher(&cli)?;
            let cert = Certificate::from_file(file)
                .with_context(|| format!("Failed to read certificate {}", file.display()))?;
            dispatcher.inject(cert.raw()).context("Certificate injection failed")?;
            info!(fingerprint = %cert.fingerprint_hex(), "Certificate injected");
            Ok(())
        }
        Commands::Clean => {
            let dispatcher = build_dispatcher(&cli)?;
            dispatcher.clean().context("Trust store cleanup failed")?;
            info!("Trust store cleanup finished");
            Ok(())
        }
    }
}

/// Load configuration, apply CLI overrides and build the dispatcher
fn build_dispatcher(cli: &Cli) -> anyhow::Result<TrustStoreDispatcher> {
    let mut config = InjectConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if !cli.stores.is_empty() {
        config.stores = cli.stores.clone();
    }

    init_logging(&config.observability, cli.verbose);
    log_config_info(&config);

    Ok(TrustStoreDispatcher::from_config(&config)?)
}

fn handle_fingerprint(file: &Path, output: &str) -> anyhow::Result<()> {
    let format = OutputFormat::parse(output)?;
    let cert = Certificate::from_file(file)
        .with_context(|| format!("Failed to read certificate {}", file.display()))?;
    let report = FingerprintReport::new(&cert);

    match format {
        OutputFormat::Json => output::print_json(&report)?,
        OutputFormat::Text => println!("{}", report.to_text()),
    }
    Ok(())
}
