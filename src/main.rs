// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "stockscan")]
#[command(about = "Live barcode scanner for medical-supply inventory")]
#[command(version)]
struct Cli {
    /// Configuration file (default: ~/.config/stockscan/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Decode a barcode from an image file
    Decode {
        /// Image to decode
        image: PathBuf,

        /// Decode the whole image instead of the centered scan band
        #[arg(long)]
        full_frame: bool,
    },

    /// Scan barcodes from a camera or from images
    Scan {
        /// Camera device path (e.g. /dev/video0)
        #[arg(short, long)]
        camera: Option<String>,

        /// Use image files as the camera instead of a device
        #[arg(short, long, num_args = 1..)]
        image: Vec<PathBuf>,

        /// Stop after the first barcode, delivering it for this target
        #[arg(long, value_name = "TARGET")]
        once: Option<String>,

        /// Inventory JSON file to look scanned barcodes up in
        #[arg(long, requires = "store")]
        inventory: Option<PathBuf>,

        /// Store whose stock is looked up
        #[arg(long)]
        store: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=stockscan=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => stockscan::Config::load_from(path)?,
        None => stockscan::Config::load()?,
    };

    match cli.command {
        Commands::List => cli::list_cameras(),
        Commands::Decode { image, full_frame } => cli::decode_image(&config, &image, full_frame),
        Commands::Scan {
            camera,
            image,
            once,
            inventory,
            store,
        } => cli::scan(
            &config,
            cli::ScanOptions {
                camera,
                images: image,
                once,
                inventory,
                store,
            },
        ),
    }
}
