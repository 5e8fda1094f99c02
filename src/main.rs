use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datapull::{
    flashpoint::{self, FlashpointConfig},
    pipeline::{self, PipelineConfig, PRESETS},
    HttpFetcher,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Fetch a dataset from the web, clean it up and write it to CSV"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a built-in preset.
    Run {
        preset: String,
        /// Directory the output files are written to.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Run a pipeline declared in a YAML file.
    RunConfig { config: PathBuf },
    /// Print a preset as YAML.
    ShowConfig { preset: String },
    /// Descriptive statistics over the Flashpoint catalogue.
    Flashpoint {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Reuse the database already on disk.
        #[arg(long)]
        skip_download: bool,
    },
    /// List the built-in presets.
    List,
}

fn main() -> Result<()> {
    // ─── logging ─────────────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Run { preset, out_dir } => {
            let config = pipeline::preset(&preset)?.with_output_dir(&out_dir);
            run_pipeline(&config)
        }
        Command::RunConfig { config } => {
            let config = PipelineConfig::from_yaml_file(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            run_pipeline(&config)
        }
        Command::ShowConfig { preset } => {
            print!("{}", pipeline::preset(&preset)?.to_yaml()?);
            Ok(())
        }
        Command::Flashpoint {
            config,
            skip_download,
        } => {
            let config = match config {
                Some(path) => FlashpointConfig::from_yaml_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => FlashpointConfig::default(),
            };
            let fetcher = HttpFetcher::new(config.timeout())?;
            let written = flashpoint::run(&config, &fetcher, skip_download)
                .context("flashpoint analysis failed")?;
            info!(files = written.len(), "done");
            Ok(())
        }
        Command::List => {
            for name in PRESETS {
                println!("{name}");
            }
            println!("flashpoint");
            Ok(())
        }
    }
}

fn run_pipeline(config: &PipelineConfig) -> Result<()> {
    let fetcher = HttpFetcher::new(config.source.timeout())?;
    let summary = pipeline::run(config, &fetcher)
        .with_context(|| format!("pipeline `{}` failed", config.name))?;

    for skipped in &summary.skipped {
        warn!(year = ?skipped.year, url = %skipped.url, "skipped: {}", skipped.error);
    }
    for path in &summary.outputs {
        info!("wrote {}", path.display());
    }
    Ok(())
}
