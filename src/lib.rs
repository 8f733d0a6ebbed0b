// SPDX-License-Identifier: MPL-2.0

//! stockscan - live barcode scanning for medical-supply inventory
//!
//! The engine samples a live camera stream twice a second, crops the
//! centered scan band, and decodes 1D retail and logistics barcodes from it.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera capability trait with V4L2 and file source backends
//! - [`scanner`]: Acquisition, sampling, decoding and the scan controller
//! - [`inventory`]: Stock lookup and ledger collaborators
//! - [`config`]: User configuration handling
//!
//! # Example
//!
//! ```ignore
//! let backend = get_backend_for_type(CameraBackendType::V4l2, None, Vec::new())?;
//! let controller = ScanController::from_config(&Config::load()?, backend.into());
//! controller.set_callbacks(
//!     ScanCallbacks::new().on_scan_success(|hit| println!("{}", hit.text)),
//! );
//! controller.start_scanner(ScanMode::Continuous);
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inventory;
pub mod scanner;

// Re-export commonly used types
pub use backends::camera::{CameraBackend, CameraBackendType, get_backend_for_type};
pub use config::Config;
pub use errors::{AcquisitionError, DecodeError, InventoryError, ScanError};
pub use scanner::{ScanCallbacks, ScanController, ScanHit, ScanMode, ScanState, Symbology};
