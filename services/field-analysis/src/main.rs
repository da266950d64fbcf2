//! Field analysis CLI.
//!
//! Runs one analysis and prints the envelope as JSON on stdout. Logs go to
//! stderr.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use catalog::AuthContext;
use clap::{Parser, Subcommand};
use field_analysis::{AnalysisConfig, ConfigOverrides, Orchestrator};
use field_common::{AnalysisStatus, FieldRecord, LatLng};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "field-analysis")]
#[command(about = "Crop-health indices and map overlays for a single field")]
struct Args {
    /// YAML configuration file
    #[arg(long, global = true, env = "FIELD_ANALYSIS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Catalog credential artifact
    #[arg(long, global = true, env = "CATALOG_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// STAC API root
    #[arg(long, global = true, env = "CATALOG_URL")]
    catalog_url: Option<String>,

    /// Tile service root
    #[arg(long, global = true, env = "TILER_URL")]
    tiler_url: Option<String>,

    /// Buffer around the field boundary, in meters
    #[arg(long, global = true, env = "FIELD_BUFFER_METERS")]
    buffer_meters: Option<f64>,

    /// Download timeout in seconds
    #[arg(long, global = true, env = "DOWNLOAD_TIMEOUT_SECS")]
    download_timeout: Option<u64>,

    /// Directory for transient downloads
    #[arg(long, global = true, env = "TRANSIENT_DIR")]
    transient_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a field boundary against the remote catalog
    Remote {
        #[arg(long)]
        field_id: String,

        /// JSON array of {"lat": .., "lng": ..} objects
        #[arg(long)]
        boundary: PathBuf,
    },

    /// Analyse a GeoTIFF behind a share link
    File {
        #[arg(long)]
        field_id: String,

        /// Share link or direct URL; omitted means no imagery yet
        #[arg(long)]
        url: Option<String>,
    },
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            credentials_path: self.credentials.clone(),
            catalog_url: self.catalog_url.clone(),
            tiler_url: self.tiler_url.clone(),
            buffer_meters: self.buffer_meters,
            download_timeout_secs: self.download_timeout,
            transient_dir: self.transient_dir.clone(),
        }
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

async fn read_boundary(path: &Path) -> Result<Vec<LatLng>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read boundary file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Boundary file {} is not a JSON array of {{lat, lng}}", path.display()))
}

async fn run(args: Args) -> Result<AnalysisStatus> {
    let mut config = AnalysisConfig::load_or_default(args.config.as_deref())?;
    config.apply(args.overrides());
    config.validate()?;

    let auth = Arc::new(AuthContext::new(&config.credentials_path));
    let orchestrator = Orchestrator::new(&config, auth)?;

    let envelope = match args.command {
        Command::Remote { field_id, boundary } => {
            let boundary = read_boundary(&boundary).await?;
            let field = FieldRecord {
                field_id,
                boundary,
                imagery_url: None,
            };
            orchestrator.analyze_remote(&field).await
        }
        Command::File { field_id, url } => {
            let field = FieldRecord {
                field_id,
                boundary: Vec::new(),
                imagery_url: url,
            };
            orchestrator.analyze_file(&field).await
        }
    };

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(envelope.status)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    if let Err(e) = init_tracing(&args.log_level, args.log_json) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting field analysis");
    match run(args).await {
        Ok(AnalysisStatus::Error) => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Field analysis aborted: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
