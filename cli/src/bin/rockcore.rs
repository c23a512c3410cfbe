use clap::{Parser, Subcommand};
use cli::{parse_max_area, save_outputs, BatchConfig, BatchJob, CoreCliError};
use color_eyre::eyre::{eyre, Result};
use defects::{DefectKind, DetectionParameters, ShapeDetector};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one image for one defect kind
    Analyze {
        /// Path to the rock-core image
        #[arg(short, long)]
        image: PathBuf,
        /// Defect kind: crack, hole or grain
        #[arg(short, long, default_value = "crack")]
        kind: DefectKind,
        /// Minimum accepted area in px² (kind default if omitted)
        #[arg(long)]
        min_area: Option<f64>,
        /// Maximum accepted area in px², or "inf" for unbounded
        #[arg(long)]
        max_area: Option<String>,
        /// Global binarization threshold, 0-255
        #[arg(short, long)]
        threshold: Option<i32>,
        /// Directory for rasters and the JSON report
        #[arg(short, long, default_value = "out")]
        output_dir: PathBuf,
        /// Also write shapes.geojson
        #[arg(long)]
        geojson: bool,
        /// Embed base64 PNGs of the rasters in report.json
        #[arg(long)]
        embed_images: bool,
    },
    /// Run every job of a TOML or JSON batch file
    Batch {
        /// Path to the batch configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List defect kinds with their default parameters
    Kinds {
        /// Print the JSON schema of the kind enum instead
        #[arg(long)]
        schema: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            image,
            kind,
            min_area,
            max_area,
            threshold,
            output_dir,
            geojson,
            embed_images,
        } => {
            let params = resolve_parameters(kind, min_area, max_area.as_deref(), threshold)?;
            analyze(&image, kind, &params, &output_dir, geojson, embed_images)?;
        }
        Commands::Batch { config } => {
            run_batch(&config).await?;
        }
        Commands::Kinds { schema } => {
            list_kinds(schema)?;
        }
    }

    Ok(())
}

fn resolve_parameters(
    kind: DefectKind,
    min_area: Option<f64>,
    max_area: Option<&str>,
    threshold: Option<i32>,
) -> Result<DetectionParameters, CoreCliError> {
    let defaults = kind.default_parameters();
    let max_area = match max_area {
        Some(raw) => parse_max_area(raw)?,
        None => defaults.max_area,
    };
    Ok(DetectionParameters::new(
        min_area.unwrap_or(defaults.min_area),
        max_area,
        threshold.unwrap_or(defaults.threshold),
    )?)
}

fn analyze(
    image_path: &Path,
    kind: DefectKind,
    params: &DetectionParameters,
    output_dir: &Path,
    geojson: bool,
    embed_images: bool,
) -> Result<()> {
    info!("Analyzing {:?} for {} ({:?})", image_path, kind, params);
    let bytes = std::fs::read(image_path)?;
    let image = defects::decode_image(&bytes)?;

    let result = kind.detector().detect(&image, params)?;
    let report = save_outputs(&result, output_dir, geojson, embed_images)?;

    println!("{} instances, total area {:.1}px²", result.summary.count, result.summary.total_area);
    if let Some(largest) = result.summary.crack().and_then(|crack| crack.largest.as_ref()) {
        println!(
            "largest crack: {} (angle {:.2} rad), max width {:.1}px, length/width {:.1}",
            largest.orientation, largest.angle, largest.max_width, largest.length_to_max_width_ratio
        );
    }
    if let Some(hole) = result.summary.hole() {
        println!("mean circularity {:.3}", hole.mean_circularity);
    }
    print!("{}", report.histogram.render(40));

    info!("Outputs written to {:?}", output_dir);
    Ok(())
}

fn run_job(job: BatchJob, output_dir: PathBuf, geojson: bool, embed_images: bool) -> Result<usize> {
    let params = job.parameters()?;
    let bytes = std::fs::read(&job.image)?;
    let image = defects::decode_image(&bytes)?;
    let result = job.kind.detector().detect(&image, &params)?;
    save_outputs(&result, output_dir.join(&job.name), geojson, embed_images)?;
    Ok(result.summary.count)
}

async fn run_batch(config_path: &Path) -> Result<()> {
    let config = BatchConfig::from_file(config_path)?;
    info!("Running {} jobs from {:?}", config.jobs.len(), config_path);
    std::fs::create_dir_all(&config.output_dir)?;

    let handles: Vec<_> = config
        .jobs
        .iter()
        .cloned()
        .map(|job| {
            let name = job.name.clone();
            let output_dir = PathBuf::from(&config.output_dir);
            let (geojson, embed_images) = (config.geojson, config.embed_images);
            (name, tokio::task::spawn_blocking(move || run_job(job, output_dir, geojson, embed_images)))
        })
        .collect();

    let mut failures = 0;
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(count)) => info!("Job '{}': {} instances", name, count),
            Ok(Err(err)) => {
                failures += 1;
                error!("Job '{}' failed: {:#}", name, err);
            }
            Err(err) => {
                failures += 1;
                error!("Job '{}' panicked: {}", name, err);
            }
        }
    }

    if failures > 0 {
        return Err(eyre!("{} of {} jobs failed", failures, config.jobs.len()));
    }
    info!("Batch completed");
    Ok(())
}

fn list_kinds(schema: bool) -> Result<()> {
    if schema {
        println!("{}", serde_json::to_string_pretty(&DefectKind::schema())?);
        return Ok(());
    }
    for kind in DefectKind::iter() {
        let params = kind.default_parameters();
        let max_area = params
            .max_area
            .map(|value| value.to_string())
            .unwrap_or_else(|| "inf".to_string());
        println!("{:<6} {}", kind, kind.description());
        println!(
            "       min_area={} max_area={} threshold={}",
            params.min_area, max_area, params.threshold
        );
    }
    Ok(())
}
