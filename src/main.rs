use clap::Parser;
use image::ImageReader;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use qrsift::region::extract_region;
use qrsift::runtime::LinkedBackends;
use qrsift::{Detector, ScanConfig, VisionRuntime};

#[derive(Parser)]
#[command(name = "qrsift")]
#[command(about = "Locate and decode a QR code in an image")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print the detection as JSON
    #[arg(long)]
    json: bool,

    /// Treat the whole image as a cropped code region (no localization)
    #[arg(long)]
    decode_only: bool,

    /// Load scan settings from a JSON file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Save the detected code region (with a thin margin) as an image
    #[arg(long, value_name = "FILE")]
    crop_out: Option<PathBuf>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };

    tracing::debug!("Loading image: {:?}", args.image_path);
    let img = ImageReader::open(&args.image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?
        .to_rgba8();
    tracing::debug!("Image loaded: {}x{}", img.width(), img.height());

    let runtime = Arc::new(VisionRuntime::new(LinkedBackends).with_timeout(config.runtime_timeout()));

    let mut detector = Detector::new().with_config(config).with_runtime(runtime);
    if let Some(debug_dir) = args.debug_out {
        detector = detector.with_debug(debug_dir)?;
    }

    if args.decode_only {
        match detector.decode(&img).await {
            Some(text) if args.json => println!("{}", serde_json::json!({ "text": text })),
            Some(text) => println!("{}", text),
            None => anyhow::bail!("No QR code could be decoded"),
        }
        return Ok(());
    }

    let Some(result) = detector
        .detect(img.as_raw(), img.width(), img.height(), None)
        .await
    else {
        anyhow::bail!("No QR code found");
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let bbox = result.candidate.bounding_box();
        println!("\n=== QR Detection Result ===");
        println!("Text: {}", result.text);
        println!("Strategy: {}", result.strategy());
        println!(
            "Bounding box: ({:.1}, {:.1}) {:.1}x{:.1}",
            bbox.x, bbox.y, bbox.width, bbox.height
        );
        if args.verbose {
            for (name, p) in ["top-left", "top-right", "bottom-right", "bottom-left"]
                .iter()
                .zip(result.corners().points())
            {
                println!("  {:<12} ({:.1}, {:.1})", name, p.x, p.y);
            }
        }
    }

    if let Some(path) = args.crop_out {
        let margin = detector.config().region_margin_ratio;
        let region = extract_region(&img, &result.candidate.bounding_box(), margin)
            .ok_or_else(|| anyhow::anyhow!("Detected region lies outside the image"))?;
        region
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save region: {}", e))?;
        tracing::info!("Saved region to {}", path.display());
    }

    Ok(())
}
