use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genre_classifier::analysis::RankedResult;
use genre_classifier::audio::TimeRange;
use genre_classifier::config::{ServiceConfig, DEFAULT_CONFIG_PATH};
use genre_classifier::http::{run_http_server, AppState, PredictResponse};
use genre_classifier::service::GenreService;
use genre_classifier::uploads::UploadStore;

#[derive(Parser, Debug)]
#[command(
    name = "genre_cli",
    about = "Music genre classification service and offline classifier"
)]
struct Cli {
    /// Configuration file (missing or invalid files fall back to defaults)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Log at debug level
    #[arg(long, short)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Classify a local audio file and print the /predict response JSON
    Classify {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        start: Option<f64>,
        #[arg(long)]
        end: Option<f64>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the configured label table
    Labels,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = ServiceConfig::load_from_file(&cli.config);

    match cli.command {
        Commands::Serve { addr } => run_serve(config, addr),
        Commands::Classify {
            file,
            start,
            end,
            output,
        } => run_classify(&config, file, start, end, output),
        Commands::Labels => run_labels(&config),
    }
}

fn run_serve(config: ServiceConfig, addr: Option<SocketAddr>) -> Result<ExitCode> {
    let addr = match addr {
        Some(addr) => addr,
        None => config
            .server
            .bind_addr
            .parse()
            .with_context(|| format!("parsing bind address {:?}", config.server.bind_addr))?,
    };

    let service = GenreService::from_config(&config).context("starting genre service")?;
    let store = UploadStore::new(&config.server.upload_dir).with_context(|| {
        format!(
            "creating upload directory {}",
            config.server.upload_dir.display()
        )
    })?;
    let state = AppState::new(Arc::new(service), store, config.server.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    runtime.block_on(run_http_server(state, addr))?;

    Ok(ExitCode::from(0))
}

fn run_classify(
    config: &ServiceConfig,
    file: PathBuf,
    start: Option<f64>,
    end: Option<f64>,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let range = TimeRange::new(
        start.unwrap_or(config.server.default_start_secs),
        end.unwrap_or(config.server.default_end_secs),
    )?;
    let service = GenreService::from_config(config).context("starting genre service")?;
    let result = service
        .classify_file(&file, range)
        .with_context(|| format!("classifying {}", file.display()))?;

    emit_report(result, output_path)?;
    Ok(ExitCode::from(0))
}

fn run_labels(config: &ServiceConfig) -> Result<ExitCode> {
    for (index, label) in config.model.labels.iter().enumerate() {
        println!("{index}: {label}");
    }
    Ok(ExitCode::from(0))
}

fn emit_report(result: RankedResult, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(&PredictResponse::ok(result))?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}
