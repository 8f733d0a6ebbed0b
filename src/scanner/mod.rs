// SPDX-License-Identifier: MPL-2.0

//! Live barcode scanner engine
//!
//! Camera frames flow through four stages:
//!
//! - [`acquisition`]: obtains the camera stream and binds it to the [`surface`]
//! - [`sampler`]: crops the scan band out of the current frame every tick
//! - [`tasks::barcode_decoder`]: extracts one symbol from the crop
//! - [`controller`]: state machine tying the stages together

pub mod acquisition;
pub mod controller;
pub mod sampler;
pub mod surface;
pub mod tasks;
pub mod types;

pub use acquisition::CameraAcquisition;
pub use controller::{ScanCallbacks, ScanController};
pub use sampler::{CropGeometry, FrameSampler};
pub use surface::{ReadyState, VideoSurface};
pub use tasks::{BarcodeDecoder, SymbolDecoder};
pub use types::{
    DecodeHints, DecodeOutcome, DecodedSymbol, FrameSample, ScanHit, ScanMode, ScanState,
    ScanTarget, ScannerStatus, Symbology,
};
