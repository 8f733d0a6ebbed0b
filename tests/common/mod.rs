// SPDX-License-Identifier: MPL-2.0

//! Shared fakes for integration tests
#![allow(dead_code)]

use futures::FutureExt;
use futures::future::BoxFuture;
use rxing::{BarcodeFormat, MultiFormatWriter, Writer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stockscan::backends::camera::{
    BackendError, BackendResult, CameraBackend, CameraBackendType, CameraDevice, CameraFrame,
    FrameSender, MediaStream, MediaTrack, StreamConstraints, frame_channel,
};
use stockscan::errors::DecodeError;
use stockscan::scanner::{
    DecodeOutcome, DecodedSymbol, FrameSample, ScanCallbacks, ScanHit, SymbolDecoder, Symbology,
};

pub const FRAME_WIDTH: u32 = 1280;
pub const FRAME_HEIGHT: u32 = 720;

/// Solid white frame
pub fn blank_frame() -> CameraFrame {
    CameraFrame::from_rgba(
        FRAME_WIDTH,
        FRAME_HEIGHT,
        vec![255; (FRAME_WIDTH * FRAME_HEIGHT * 4) as usize],
    )
}

pub fn barcode_format(symbology: Symbology) -> BarcodeFormat {
    match symbology {
        Symbology::Code128 => BarcodeFormat::CODE_128,
        Symbology::Ean13 => BarcodeFormat::EAN_13,
        Symbology::Code39 => BarcodeFormat::CODE_39,
        Symbology::Ean8 => BarcodeFormat::EAN_8,
        Symbology::UpcA => BarcodeFormat::UPC_A,
        Symbology::UpcE => BarcodeFormat::UPC_E,
    }
}

/// Frame with a barcode of about 480x120 px drawn in the middle
pub fn barcode_frame(text: &str, symbology: Symbology) -> CameraFrame {
    let matrix = MultiFormatWriter::default()
        .encode(text, &barcode_format(symbology), 480, 120)
        .expect("encode test barcode");
    let (bw, bh) = (matrix.getWidth(), matrix.getHeight());
    assert!(bw <= FRAME_WIDTH && bh <= FRAME_HEIGHT);

    let mut data = vec![255u8; (FRAME_WIDTH * FRAME_HEIGHT * 4) as usize];
    let x0 = (FRAME_WIDTH - bw) / 2;
    let y0 = (FRAME_HEIGHT - bh) / 2;
    for y in 0..bh {
        for x in 0..bw {
            if matrix.get(x, y) {
                let offset = (((y0 + y) * FRAME_WIDTH + x0 + x) * 4) as usize;
                data[offset..offset + 3].copy_from_slice(&[0, 0, 0]);
            }
        }
    }
    CameraFrame::from_rgba(FRAME_WIDTH, FRAME_HEIGHT, data)
}

/// Track that counts how many fake streams are still live
struct FakeTrack {
    live: Arc<AtomicUsize>,
    stopped: bool,
    _sender: FrameSender,
}

impl MediaTrack for FakeTrack {
    fn label(&self) -> &str {
        "fake"
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_live(&self) -> bool {
        !self.stopped
    }
}

enum Behaviour {
    Grant { frame: Arc<CameraFrame>, delay: Duration },
    Deny(BackendError),
    Hang,
}

struct FakeInner {
    behaviour: Behaviour,
    live: Arc<AtomicUsize>,
    acquires: AtomicUsize,
}

/// Camera backend with scripted acquisition
#[derive(Clone)]
pub struct FakeCamera {
    inner: Arc<FakeInner>,
}

impl FakeCamera {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                behaviour,
                live: Arc::new(AtomicUsize::new(0)),
                acquires: AtomicUsize::new(0),
            }),
        }
    }

    /// Grants a stream showing `frame`
    pub fn showing(frame: CameraFrame) -> Self {
        Self::with(Behaviour::Grant {
            frame: Arc::new(frame),
            delay: Duration::ZERO,
        })
    }

    /// Grants a stream after `delay`
    pub fn slow(frame: CameraFrame, delay: Duration) -> Self {
        Self::with(Behaviour::Grant {
            frame: Arc::new(frame),
            delay,
        })
    }

    pub fn denying(err: BackendError) -> Self {
        Self::with(Behaviour::Deny(err))
    }

    /// Never answers
    pub fn hanging() -> Self {
        Self::with(Behaviour::Hang)
    }

    /// Streams handed out and not yet stopped
    pub fn live_streams(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    pub fn acquire_count(&self) -> usize {
        self.inner.acquires.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> Arc<dyn CameraBackend> {
        Arc::new(self.clone())
    }
}

impl CameraBackend for FakeCamera {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        Vec::new()
    }

    fn acquire(&self, _constraints: &StreamConstraints) -> BoxFuture<'static, BackendResult<MediaStream>> {
        self.inner.acquires.fetch_add(1, Ordering::SeqCst);
        match &self.inner.behaviour {
            Behaviour::Grant { frame, delay } => {
                let frame = Arc::clone(frame);
                let delay = *delay;
                let live = Arc::clone(&self.inner.live);
                async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let (sender, receiver) = frame_channel();
                    sender.send_replace(Some(frame));
                    live.fetch_add(1, Ordering::SeqCst);
                    let track = FakeTrack {
                        live,
                        stopped: false,
                        _sender: sender,
                    };
                    Ok(MediaStream::new(vec![Box::new(track)], receiver))
                }
                .boxed()
            }
            Behaviour::Deny(err) => {
                let err = err.clone();
                async move { Err(err) }.boxed()
            }
            Behaviour::Hang => futures::future::pending().boxed(),
        }
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::FileSource
    }
}

/// Decoder answering from a script, one entry per attempt
///
/// Attempts past the end of the script find nothing.
pub struct ScriptedDecoder {
    script: Mutex<VecDeque<Result<DecodeOutcome, DecodeError>>>,
    attempts: AtomicU64,
}

impl ScriptedDecoder {
    pub fn new(script: Vec<Result<DecodeOutcome, DecodeError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            attempts: AtomicU64::new(0),
        })
    }

    /// Finds `text` on the given (1-based) attempts only
    pub fn hits_on(attempts: &[u64], text: &str) -> Arc<Self> {
        let last = attempts.iter().copied().max().unwrap_or(0);
        let script = (1..=last)
            .map(|n| {
                if attempts.contains(&n) {
                    Ok(found(text))
                } else {
                    Ok(DecodeOutcome::NotFound)
                }
            })
            .collect();
        Self::new(script)
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SymbolDecoder for ScriptedDecoder {
    fn decode(&self, _sample: &FrameSample) -> Result<DecodeOutcome, DecodeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(DecodeOutcome::NotFound))
    }
}

pub fn found(text: &str) -> DecodeOutcome {
    DecodeOutcome::Found(DecodedSymbol {
        text: text.to_string(),
        symbology: Symbology::Code128,
    })
}

/// Records every callback invocation
#[derive(Clone, Default)]
pub struct Recorder {
    hits: Arc<Mutex<Vec<ScanHit>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn callbacks(&self) -> ScanCallbacks {
        let hits = Arc::clone(&self.hits);
        let failures = Arc::clone(&self.failures);
        ScanCallbacks::new()
            .on_scan_success(move |hit| hits.lock().unwrap().push(hit.clone()))
            .on_scan_failure(move |err| failures.lock().unwrap().push(err.to_string()))
    }

    pub fn hits(&self) -> Vec<ScanHit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap().clone()
    }
}
