// SPDX-License-Identifier: GPL-3.0-only

//! Barcode decoding task
//!
//! Uses the rxing crate (a ZXing port). The sampled RGBA crop is reduced to
//! luminance, binarized with a hybrid local threshold, and handed to the
//! multi-format reader restricted to the configured symbologies.

use crate::errors::DecodeError;
use crate::scanner::types::{DecodeHints, DecodeOutcome, DecodedSymbol, FrameSample, Symbology};
use image::{DynamicImage, RgbaImage};
use rxing::common::HybridBinarizer;
use rxing::{
    BarcodeFormat, BinaryBitmap, DecodeHintValue, Exceptions, Luma8LuminanceSource,
    MultiFormatReader, Reader,
};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Extracts one barcode symbol from a sampled frame
///
/// `NotFound` is the normal answer for most frames. `Err` is reserved for
/// failures that make further attempts pointless.
pub trait SymbolDecoder: Send + Sync {
    fn decode(&self, sample: &FrameSample) -> Result<DecodeOutcome, DecodeError>;
}

impl Symbology {
    fn to_format(self) -> BarcodeFormat {
        match self {
            Symbology::Code128 => BarcodeFormat::CODE_128,
            Symbology::Ean13 => BarcodeFormat::EAN_13,
            Symbology::Code39 => BarcodeFormat::CODE_39,
            Symbology::Ean8 => BarcodeFormat::EAN_8,
            Symbology::UpcA => BarcodeFormat::UPC_A,
            Symbology::UpcE => BarcodeFormat::UPC_E,
        }
    }

    fn from_format(format: &BarcodeFormat) -> Option<Self> {
        match format {
            BarcodeFormat::CODE_128 => Some(Symbology::Code128),
            BarcodeFormat::EAN_13 => Some(Symbology::Ean13),
            BarcodeFormat::CODE_39 => Some(Symbology::Code39),
            BarcodeFormat::EAN_8 => Some(Symbology::Ean8),
            BarcodeFormat::UPC_A => Some(Symbology::UpcA),
            BarcodeFormat::UPC_E => Some(Symbology::UpcE),
            _ => None,
        }
    }
}

/// rxing-backed decoder
///
/// Hints are fixed at construction and shared by every attempt.
pub struct BarcodeDecoder {
    hints: DecodeHints,
    formats: HashSet<BarcodeFormat>,
}

impl Default for BarcodeDecoder {
    fn default() -> Self {
        Self::new(DecodeHints::default())
    }
}

impl BarcodeDecoder {
    pub fn new(hints: DecodeHints) -> Self {
        let formats = hints.formats.iter().map(|s| s.to_format()).collect();
        debug!(formats = ?hints.formats, try_harder = hints.try_harder, "Barcode decoder configured");
        Self { hints, formats }
    }

    pub fn hints(&self) -> &DecodeHints {
        &self.hints
    }

    fn reader_hints(&self) -> rxing::DecodeHints {
        rxing::DecodeHints::default()
            .with(DecodeHintValue::PossibleFormats(self.formats.clone()))
            .with(DecodeHintValue::TryHarder(self.hints.try_harder))
    }
}

impl SymbolDecoder for BarcodeDecoder {
    fn decode(&self, sample: &FrameSample) -> Result<DecodeOutcome, DecodeError> {
        let start = std::time::Instant::now();

        if sample.width == 0 || sample.height == 0 || !sample.is_well_formed() {
            return Err(DecodeError::MalformedBuffer(format!(
                "{}x{} RGBA needs {} bytes, got {}",
                sample.width,
                sample.height,
                sample.width as usize * sample.height as usize * 4,
                sample.data.len()
            )));
        }

        let rgba = RgbaImage::from_raw(sample.width, sample.height, sample.data.clone())
            .ok_or_else(|| DecodeError::MalformedBuffer("RGBA data does not match dimensions".to_string()))?;
        let luma = DynamicImage::ImageRgba8(rgba).to_luma8().into_raw();

        let conversion_time = start.elapsed();
        trace!(
            width = sample.width,
            height = sample.height,
            conversion_ms = conversion_time.as_millis(),
            "Prepared luminance buffer"
        );

        let source = Luma8LuminanceSource::new(luma, sample.width, sample.height);
        let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
        let mut reader = MultiFormatReader::default();

        let outcome = match reader.decode_with_hints(&mut bitmap, &self.reader_hints()) {
            Ok(result) => match Symbology::from_format(result.getBarcodeFormat()) {
                Some(symbology) => {
                    debug!(
                        text = result.getText(),
                        symbology = %symbology,
                        "Barcode decoded"
                    );
                    DecodeOutcome::Found(DecodedSymbol {
                        text: result.getText().to_string(),
                        symbology,
                    })
                }
                None => {
                    warn!(format = ?result.getBarcodeFormat(), "Decoder returned an unrequested format");
                    DecodeOutcome::NotFound
                }
            },
            Err(e) => not_found_or_error(e)?,
        };

        trace!(
            decode_ms = (start.elapsed() - conversion_time).as_millis(),
            found = matches!(outcome, DecodeOutcome::Found(_)),
            "Decode attempt complete"
        );
        Ok(outcome)
    }
}

/// Only the reader's not-found signal is a normal outcome
fn not_found_or_error(err: Exceptions) -> Result<DecodeOutcome, DecodeError> {
    match err {
        Exceptions::NotFoundException(_) => Ok(DecodeOutcome::NotFound),
        other => Err(DecodeError::Decoder(other.to_string())),
    }
}
