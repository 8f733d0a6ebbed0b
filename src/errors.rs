// SPDX-License-Identifier: MPL-2.0

//! Error types for the scanner engine and its collaborators

use crate::backends::camera::BackendError;
use std::fmt;
use std::time::Duration;

/// Every error the scan controller reports through its failure callback
#[derive(Debug, Clone)]
pub enum ScanError {
    /// The camera stream could not be obtained
    Acquisition(AcquisitionError),
    /// The decoder failed for a reason other than "no symbol"
    Decode(DecodeError),
}

/// Camera acquisition errors
#[derive(Debug, Clone)]
pub enum AcquisitionError {
    /// The backend refused or failed to open a stream
    Backend(BackendError),
    /// The backend did not answer within the configured timeout
    TimedOut(Duration),
}

/// Unexpected decoder failures
///
/// "No symbol in frame" is not an error and never appears here.
#[derive(Debug, Clone)]
pub enum DecodeError {
    /// Buffer size does not match its declared dimensions
    MalformedBuffer(String),
    /// Decoder library failure
    Decoder(String),
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Reading or writing the file failed
    Io(String),
    /// The file is not valid configuration JSON
    Parse(String),
    /// A value is out of range
    Invalid(String),
    /// No configuration directory on this platform
    NoConfigDir,
}

/// Inventory collaborator errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// Batch id does not exist
    UnknownBatch(String),
    /// Not enough stock for a consumption or transfer
    InsufficientStock {
        batch_id: String,
        requested: u32,
        available: u32,
    },
    /// Batch is not held by the store named in the request
    WrongStore { batch_id: String, store_id: String },
    /// Quantity must be positive
    InvalidQuantity(String),
    /// Destination batch cannot hold the incoming stock
    QuantityOverflow { batch_id: String },
    /// Loading the inventory file failed
    Load(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Acquisition(e) => write!(f, "{}", e),
            ScanError::Decode(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::Backend(e) => write!(f, "Camera acquisition failed: {}", e),
            AcquisitionError::TimedOut(d) => write!(
                f,
                "Camera acquisition failed: timed out after {} ms",
                d.as_millis()
            ),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MalformedBuffer(msg) => write!(f, "Decode failed: malformed buffer: {}", msg),
            DecodeError::Decoder(msg) => write!(f, "Decode failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Configuration I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Invalid configuration file: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration value: {}", msg),
            ConfigError::NoConfigDir => write!(f, "No configuration directory available"),
        }
    }
}

impl fmt::Display for InventoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryError::UnknownBatch(id) => write!(f, "Unknown stock batch: {}", id),
            InventoryError::InsufficientStock {
                batch_id,
                requested,
                available,
            } => write!(
                f,
                "Insufficient stock in batch {}: requested {}, available {}",
                batch_id, requested, available
            ),
            InventoryError::WrongStore { batch_id, store_id } => {
                write!(f, "Batch {} is not held by store {}", batch_id, store_id)
            }
            InventoryError::InvalidQuantity(msg) => write!(f, "Invalid quantity: {}", msg),
            InventoryError::QuantityOverflow { batch_id } => {
                write!(f, "Quantity of batch {} would overflow", batch_id)
            }
            InventoryError::Load(msg) => write!(f, "Failed to load inventory: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}
impl std::error::Error for AcquisitionError {}
impl std::error::Error for DecodeError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for InventoryError {}

impl From<AcquisitionError> for ScanError {
    fn from(err: AcquisitionError) -> Self {
        ScanError::Acquisition(err)
    }
}

impl From<DecodeError> for ScanError {
    fn from(err: DecodeError) -> Self {
        ScanError::Decode(err)
    }
}

impl From<BackendError> for AcquisitionError {
    fn from(err: BackendError) -> Self {
        AcquisitionError::Backend(err)
    }
}

impl From<BackendError> for ScanError {
    fn from(err: BackendError) -> Self {
        ScanError::Acquisition(AcquisitionError::Backend(err))
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for InventoryError {
    fn from(err: std::io::Error) -> Self {
        InventoryError::Load(err.to_string())
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        InventoryError::Load(err.to_string())
    }
}
