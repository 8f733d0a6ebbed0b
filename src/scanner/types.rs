// SPDX-License-Identifier: MPL-2.0

//! Types shared by the scanner pipeline stages

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Barcode symbologies the engine recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Symbology {
    Code128,
    #[serde(rename = "ean-13")]
    Ean13,
    Code39,
    #[serde(rename = "ean-8")]
    Ean8,
    UpcA,
    UpcE,
}

impl Symbology {
    /// All supported symbologies, in the order they are tried
    pub const ALL: [Symbology; 6] = [
        Symbology::Code128,
        Symbology::Ean13,
        Symbology::Code39,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
    ];

    /// Short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Symbology::Code128 => "code128",
            Symbology::Ean13 => "ean-13",
            Symbology::Code39 => "code39",
            Symbology::Ean8 => "ean-8",
            Symbology::UpcA => "upc-a",
            Symbology::UpcE => "upc-e",
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoder configuration, fixed once the decoder is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeHints {
    /// Symbologies to look for
    pub formats: Vec<Symbology>,
    /// Spend more time per frame for better recall
    pub try_harder: bool,
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self {
            formats: Symbology::ALL.to_vec(),
            try_harder: true,
        }
    }
}

/// A decoded barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub text: String,
    pub symbology: Symbology,
}

/// Result of one decode attempt
///
/// Frames without a readable symbol are the common case, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Found(DecodedSymbol),
    NotFound,
}

/// Tightly packed RGBA pixels of one sampled crop
#[derive(Debug, Clone)]
pub struct FrameSample {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameSample {
    /// Whether the buffer length matches the dimensions
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.width as usize * self.height as usize * 4
    }
}

/// Opaque identifier of what a single-shot scan is for
///
/// Typically the form field or batch that receives the scanned code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget(pub String);

impl ScanTarget {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a scan session ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// Keep scanning until stopped, reporting every hit
    Continuous,
    /// Stop after the first hit, which is delivered for `target`
    SingleShot { target: ScanTarget },
}

impl ScanMode {
    pub fn single_shot(target: impl Into<String>) -> Self {
        ScanMode::SingleShot {
            target: ScanTarget::new(target),
        }
    }

    /// Target of a single-shot scan
    pub fn target(&self) -> Option<&ScanTarget> {
        match self {
            ScanMode::Continuous => None,
            ScanMode::SingleShot { target } => Some(target),
        }
    }

    pub fn is_single_shot(&self) -> bool {
        matches!(self, ScanMode::SingleShot { .. })
    }
}

/// Scan controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    /// Waiting for the camera stream
    Acquiring,
    /// Stream bound and sampler armed
    Active,
    /// Tearing the session down
    Stopping,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanState::Idle => "idle",
            ScanState::Acquiring => "acquiring",
            ScanState::Active => "active",
            ScanState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Snapshot of the controller published to observers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScannerStatus {
    pub state: ScanState,
    /// True while a session exists (acquiring or active)
    pub active: bool,
    /// Message of the last failure, kept until the next start
    pub error: Option<String>,
    /// Sampler ticks since the controller was created
    pub ticks: u64,
}

/// A successful scan delivered to the success callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHit {
    pub text: String,
    pub symbology: Symbology,
    /// Target captured when the session started (single-shot only)
    pub target: Option<ScanTarget>,
    /// Tick on which the symbol was decoded
    pub tick: u64,
    pub session: Uuid,
}
