// SPDX-License-Identifier: MPL-2.0

//! Per-frame analysis tasks run by the scanner

pub mod barcode_decoder;

pub use barcode_decoder::{BarcodeDecoder, SymbolDecoder};
