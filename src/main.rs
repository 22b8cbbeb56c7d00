use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catsym::processing::face::{FaceLocator, FullFrameLocator, SeetaFaceLocator};
use catsym::processing::filters::OrderStatistic;
use catsym::report::contact_sheet;
use catsym::{CatFaceProcessor, FilterSettings, ProcessedImages, SymmetryReport, gallery};

#[derive(Parser)]
#[command(name = "catsym")]
#[command(about = "Filter cat face photos and score their left-right symmetry")]
struct Cli {
    /// Image file, or a directory of images
    #[arg(value_name = "PATH")]
    path: PathBuf,

    /// SeetaFace model used to locate the face (whole image is used without it)
    #[arg(long, value_name = "MODEL")]
    detector: Option<PathBuf>,

    /// Minimum face size for detection
    #[arg(long, default_value = "30")]
    min_face_size: u32,

    /// JSON file with filter settings
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Order-statistic filter to apply (median, min or max)
    #[arg(long, value_name = "KIND")]
    order_filter: Option<OrderStatistic>,

    /// Save all output images and a report to this directory
    #[arg(short, long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Save per-step pipeline outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let mut settings = match &args.settings {
        Some(path) => FilterSettings::from_json_file(path)?,
        None => FilterSettings::default(),
    };
    if let Some(kind) = args.order_filter {
        settings.order_kind = kind;
    }

    let locator: Box<dyn FaceLocator> = match &args.detector {
        Some(model) => Box::new(SeetaFaceLocator::from_model(model, args.min_face_size)?),
        None => Box::new(FullFrameLocator),
    };

    let mut processor = CatFaceProcessor::new(locator)
        .with_settings(settings)
        .with_verbose(args.verbose);

    if args.path.is_dir() {
        if args.debug_out.is_some() {
            warn!("--debug-out is only used for single images, ignoring it");
        }
        return run_gallery(&mut processor, &args);
    }

    if let Some(debug_dir) = &args.debug_out {
        processor = processor.with_debug(debug_dir.clone());
    }

    let processed = processor.process_file(&args.path)?;
    let report = processed.report(Some(args.path.as_path()));

    if let Some(out_dir) = &args.out {
        save_outputs(&processed, &report, out_dir)?;
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.summary());
    }

    Ok(())
}

fn run_gallery(processor: &mut CatFaceProcessor, args: &Cli) -> anyhow::Result<()> {
    let mut reports = Vec::new();
    let mut failures = 0usize;

    let visited = gallery::process_directory(processor, &args.path, |entry| {
        let processed = match &entry.outcome {
            Ok(processed) => processed,
            Err(e) => {
                failures += 1;
                if !args.json {
                    println!("{}: error: {}", entry.path.display(), e);
                }
                return;
            }
        };

        let report = processed.report(Some(entry.path.as_path()));
        if let Some(out_dir) = &args.out {
            let stem = entry
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            if let Err(e) = save_outputs(processed, &report, &out_dir.join(stem)) {
                warn!(path = %entry.path.display(), error = %e, "Failed to save outputs");
            }
        }

        if !args.json {
            println!(
                "{}: {:.1}% ({})",
                entry.path.display(),
                report.score,
                report.label
            );
        }
        reports.push(report);
    })?;

    if visited == 0 {
        println!("No images found in {}", args.path.display());
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("\nProcessed {} image(s), {} failed", visited - failures, failures);
    }

    Ok(())
}

fn save_outputs(processed: &ProcessedImages, report: &SymmetryReport, dir: &Path) -> anyhow::Result<()> {
    let written = processed.save_all(dir)?;

    let halves_path = dir.join("halves.png");
    processed
        .halves()
        .save(&halves_path)
        .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", halves_path.display(), e))?;

    let sheet_path = dir.join("contact_sheet.png");
    contact_sheet(&processed.process_images(), 3, 400)
        .save(&sheet_path)
        .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", sheet_path.display(), e))?;

    report.save_json(&dir.join("report.json"))?;

    info!(dir = %dir.display(), images = written.len() + 2, "Outputs saved");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
