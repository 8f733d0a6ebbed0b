// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for scanner operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Decoding a barcode from an image file
//! - Running the live scanner, optionally against an inventory

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockscan::backends::camera::file_source::load_image_as_frame;
use stockscan::backends::camera::{CameraBackendType, get_backend_for_type};
use stockscan::inventory::{InventoryLookup, MemoryInventory, StockBatch, StoreId};
use stockscan::scanner::{
    BarcodeDecoder, DecodeOutcome, FrameSampler, ScanCallbacks, ScanController,
    ScanHit, ScanMode, SymbolDecoder,
};
use stockscan::Config;
use tokio::sync::mpsc;

/// Options of the `scan` subcommand
pub struct ScanOptions {
    pub camera: Option<String>,
    pub images: Vec<PathBuf>,
    pub once: Option<String>,
    pub inventory: Option<PathBuf>,
    pub store: Option<String>,
}

enum ScanEnd {
    Done,
    Failed(String),
    Interrupted,
}

/// List all available cameras
pub fn list_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(CameraBackendType::V4l2, None, Vec::new())?;
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Device: {}", camera.path);
        if let Some(facing) = camera.facing {
            println!("      Facing: {:?}", facing);
        }
        if let Some(info) = &camera.device_info {
            println!("      Driver: {}", info.driver);
        }
        println!();
    }

    Ok(())
}

/// Decode one image the way a scan tick would
pub fn decode_image(
    config: &Config,
    path: &Path,
    full_frame: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = load_image_as_frame(path)?;
    println!("Image: {}x{}", frame.width, frame.height);

    let sampler = if full_frame {
        FrameSampler::new(1.0, 1.0)
    } else {
        FrameSampler::new(config.crop_width_ratio, config.crop_height_ratio)
    };
    let Some(sample) = sampler.sample_frame(&frame) else {
        return Err("Image too small to sample".into());
    };

    let decoder = BarcodeDecoder::new(config.decode.clone());
    match decoder.decode(&sample)? {
        DecodeOutcome::Found(symbol) => println!("{}: {}", symbol.symbology, symbol.text),
        DecodeOutcome::NotFound => println!("No barcode found."),
    }

    Ok(())
}

/// Run the live scanner until a single-shot hit, a failure, or Ctrl+C
pub fn scan(config: &Config, options: ScanOptions) -> Result<(), Box<dyn std::error::Error>> {
    let backend = if options.images.is_empty() {
        let device = options.camera.clone().or_else(|| config.camera.device_path.clone());
        get_backend_for_type(config.backend, device, Vec::new())?
    } else {
        get_backend_for_type(CameraBackendType::FileSource, None, options.images.clone())?
    };

    let inventory = match (&options.inventory, &options.store) {
        (Some(path), Some(store)) => Some((
            Arc::new(MemoryInventory::load_from(path)?),
            StoreId::new(store.clone()),
        )),
        _ => None,
    };

    let mode = match &options.once {
        Some(target) => ScanMode::single_shot(target.clone()),
        None => ScanMode::Continuous,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let controller = ScanController::from_config(config, Arc::from(backend));
    runtime.block_on(run_scan(controller, mode, inventory))
}

async fn run_scan(
    controller: ScanController,
    mode: ScanMode,
    inventory: Option<(Arc<MemoryInventory>, StoreId)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let single_shot = mode.is_single_shot();
    let (end_tx, mut end_rx) = mpsc::unbounded_channel();

    let success_tx = end_tx.clone();
    let failure_tx = end_tx.clone();
    controller.set_callbacks(
        ScanCallbacks::new()
            .on_scan_success(move |hit| {
                print_hit(hit);
                if let Some((inventory, store)) = &inventory {
                    print_stock(inventory.as_ref(), store, &hit.text);
                }
                if single_shot {
                    let _ = success_tx.send(ScanEnd::Done);
                }
            })
            .on_scan_failure(move |err| {
                let _ = failure_tx.send(ScanEnd::Failed(err.to_string()));
            }),
    );

    // Ctrl+C stops the scanner from the signal thread
    let ctrlc_controller = controller.clone();
    ctrlc::set_handler(move || {
        ctrlc_controller.stop_scanner();
        let _ = end_tx.send(ScanEnd::Interrupted);
    })?;

    controller.start_scanner(mode);
    if single_shot {
        println!("Scanning for one barcode... (Ctrl+C to cancel)");
    } else {
        println!("Scanning... (Ctrl+C to stop)");
    }

    let end = end_rx.recv().await.unwrap_or(ScanEnd::Interrupted);
    controller.stop_scanner();

    match end {
        ScanEnd::Done => Ok(()),
        ScanEnd::Interrupted => {
            println!();
            println!("Stopped after {} ticks.", controller.tick_count());
            Ok(())
        }
        ScanEnd::Failed(msg) => Err(msg.into()),
    }
}

fn print_hit(hit: &ScanHit) {
    match &hit.target {
        Some(target) => println!(
            "[tick {}] {} {} -> {}",
            hit.tick, hit.symbology, hit.text, target
        ),
        None => println!("[tick {}] {} {}", hit.tick, hit.symbology, hit.text),
    }
}

fn print_stock(inventory: &dyn InventoryLookup, store: &StoreId, barcode: &str) {
    let Some(batch) = inventory.find_by_barcode(barcode, store) else {
        println!("    not stocked at {}", store);
        return;
    };
    println!("    {}", describe_batch(&batch));
}

fn describe_batch(batch: &StockBatch) -> String {
    let today = Local::now().date_naive();
    let expiry = if batch.is_expired(today) {
        format!("EXPIRED {}", batch.expiry)
    } else {
        format!(
            "expires {} ({} days)",
            batch.expiry,
            batch.days_until_expiry(today)
        )
    };
    format!(
        "{} batch {}: {} in stock, {}",
        batch.product_name, batch.batch_number, batch.quantity, expiry
    )
}
