// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the scan controller state machine
//!
//! Run on paused Tokio time so the 500 ms cadence is exact.

mod common;

use common::{FakeCamera, Recorder, ScriptedDecoder, barcode_frame, blank_frame, found};
use std::sync::Arc;
use std::time::Duration;
use stockscan::backends::camera::{BackendError, StreamConstraints};
use stockscan::errors::DecodeError;
use stockscan::scanner::{
    BarcodeDecoder, CameraAcquisition, DecodeOutcome, ScanCallbacks, ScanController, ScanMode,
    ScanState, SymbolDecoder, Symbology,
};

const TICK: Duration = Duration::from_millis(500);

fn controller(camera: &FakeCamera, decoder: Arc<dyn SymbolDecoder>) -> ScanController {
    let acquisition = CameraAcquisition::new(camera.backend(), StreamConstraints::default());
    ScanController::new(acquisition, decoder)
}

/// Wait until the session left `Acquiring`
async fn settle(controller: &ScanController) {
    controller
        .subscribe()
        .wait_for(|s| s.state != ScanState::Acquiring)
        .await
        .expect("controller alive");
}

/// Let `n` sampler ticks elapse
async fn ticks(n: u32) {
    tokio::time::sleep(TICK * n + Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_when_idle_is_noop() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::new(Vec::new());
    let controller = controller(&camera, decoder.clone());
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());
    let before = controller.status();

    controller.stop_scanner();
    controller.stop_scanner();

    assert_eq!(controller.status(), before);
    assert_eq!(controller.state(), ScanState::Idle);
    assert!(!controller.is_scanner_active());
    assert!(recorder.hits().is_empty());
    assert!(recorder.failures().is_empty());
    assert_eq!(camera.acquire_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_one_period_after_activation() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::new(Vec::new());
    let controller = controller(&camera, decoder.clone());

    controller.start_scanner(ScanMode::Continuous);
    assert_eq!(controller.state(), ScanState::Acquiring);
    assert!(controller.is_scanner_active());
    settle(&controller).await;
    assert_eq!(controller.state(), ScanState::Active);
    assert!(controller.surface().is_playing());

    tokio::time::sleep(TICK - Duration::from_millis(1)).await;
    assert_eq!(decoder.attempts(), 0);
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(decoder.attempts(), 1);
    assert_eq!(controller.tick_count(), 1);

    controller.stop_scanner();
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_active_releases_everything() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::new(Vec::new());
    let controller = controller(&camera, decoder.clone());
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;
    ticks(2).await;
    assert_eq!(decoder.attempts(), 2);
    assert_eq!(camera.live_streams(), 1);

    controller.stop_scanner();
    assert_eq!(controller.state(), ScanState::Idle);
    assert!(!controller.is_scanner_active());
    assert_eq!(camera.live_streams(), 0);
    assert!(controller.surface().source_id().is_none());

    ticks(4).await;
    assert_eq!(decoder.attempts(), 2);
    assert!(recorder.hits().is_empty());
    assert!(recorder.failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_single_shot_success_on_third_tick() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::hits_on(&[3, 4], "4006381333931");
    let controller = controller(&camera, decoder.clone());
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::single_shot("batch-barcode"));
    settle(&controller).await;
    ticks(6).await;

    let hits = recorder.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "4006381333931");
    assert_eq!(hits[0].tick, 3);
    assert_eq!(hits[0].target.as_ref().map(|t| t.as_str()), Some("batch-barcode"));

    // Tick 4 never decodes
    assert_eq!(decoder.attempts(), 3);
    assert_eq!(controller.state(), ScanState::Idle);
    assert!(!controller.is_scanner_active());
    assert_eq!(camera.live_streams(), 0);
    assert!(controller.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_single_shot_session_is_over_when_callback_runs() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::hits_on(&[1], "LOT-1");
    let controller = controller(&camera, decoder.clone());

    let observed = Arc::new(std::sync::Mutex::new(None));
    let observed_in_cb = Arc::clone(&observed);
    let handle = controller.clone();
    controller.set_callbacks(ScanCallbacks::new().on_scan_success(move |_| {
        *observed_in_cb.lock().unwrap() = Some((handle.state(), handle.is_scanner_active()));
    }));

    controller.start_scanner(ScanMode::single_shot("field"));
    settle(&controller).await;
    ticks(1).await;

    assert_eq!(*observed.lock().unwrap(), Some((ScanState::Idle, false)));
}

#[tokio::test(start_paused = true)]
async fn test_continuous_reports_every_hit_in_order() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::new(
        (1..=9)
            .map(|n| match n {
                2 => Ok(found("A")),
                5 => Ok(found("B")),
                9 => Ok(found("C")),
                _ => Ok(DecodeOutcome::NotFound),
            })
            .collect(),
    );
    let controller = controller(&camera, decoder.clone());
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;
    ticks(10).await;

    let hits = recorder.hits();
    let seen: Vec<(&str, u64)> = hits.iter().map(|h| (h.text.as_str(), h.tick)).collect();
    assert_eq!(seen, vec![("A", 2), ("B", 5), ("C", 9)]);
    assert!(hits.iter().all(|h| h.target.is_none()));
    assert_eq!(controller.state(), ScanState::Active);
    assert!(controller.is_scanner_active());

    controller.stop_scanner();
    assert_eq!(controller.state(), ScanState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied() {
    let camera = FakeCamera::denying(BackendError::PermissionDenied(
        "camera access blocked".to_string(),
    ));
    let decoder = ScriptedDecoder::new(Vec::new());
    let controller = controller(&camera, decoder.clone());
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;
    ticks(4).await;

    let failures = recorder.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("Permission denied"));
    assert!(failures[0].starts_with("Camera acquisition failed"));
    assert_eq!(controller.error().as_deref(), Some(failures[0].as_str()));
    assert!(!controller.is_scanner_active());
    assert_eq!(controller.state(), ScanState::Idle);
    assert_eq!(decoder.attempts(), 0);
    assert!(recorder.hits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_error_kept_on_stop_and_cleared_on_start() {
    let camera = FakeCamera::denying(BackendError::DeviceNotFound("/dev/video9".to_string()));
    let controller = controller(&camera, ScriptedDecoder::new(Vec::new()));

    controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;
    assert!(controller.error().is_some());

    controller.stop_scanner();
    assert!(controller.error().is_some());

    controller.start_scanner(ScanMode::Continuous);
    assert!(controller.error().is_none());
    assert_eq!(controller.state(), ScanState::Acquiring);
    settle(&controller).await;
    assert!(controller.error().unwrap().contains("Device not found"));
}

#[tokio::test(start_paused = true)]
async fn test_blank_ticks_stay_silent() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = Arc::new(BarcodeDecoder::default());
    let controller = controller(&camera, decoder);
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;
    ticks(5).await;

    assert!(recorder.hits().is_empty());
    assert!(recorder.failures().is_empty());
    assert_eq!(controller.state(), ScanState::Active);
    assert_eq!(controller.tick_count(), 5);
    assert!(controller.error().is_none());

    controller.stop_scanner();
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_decode_error_is_fatal() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::new(vec![
        Ok(DecodeOutcome::NotFound),
        Err(DecodeError::Decoder("reader exploded".to_string())),
    ]);
    let controller = controller(&camera, decoder.clone());
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;
    ticks(5).await;

    assert_eq!(recorder.failures(), vec!["Decode failed: reader exploded".to_string()]);
    assert_eq!(decoder.attempts(), 2);
    assert_eq!(controller.state(), ScanState::Idle);
    assert_eq!(camera.live_streams(), 0);
    assert_eq!(
        controller.error().as_deref(),
        Some("Decode failed: reader exploded")
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_acquisition_releases_late_stream() {
    let camera = FakeCamera::slow(blank_frame(), Duration::from_secs(2));
    let decoder = ScriptedDecoder::new(Vec::new());
    let controller = controller(&camera, decoder.clone());
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::Continuous);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.state(), ScanState::Acquiring);

    controller.stop_scanner();
    assert_eq!(controller.state(), ScanState::Idle);

    ticks(8).await;
    assert_eq!(camera.live_streams(), 0);
    assert_eq!(decoder.attempts(), 0);
    assert_eq!(controller.state(), ScanState::Idle);
    assert!(recorder.failures().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_acquisition_timeout() {
    let camera = FakeCamera::hanging();
    let acquisition = CameraAcquisition::new(camera.backend(), StreamConstraints::default())
        .with_timeout(Some(Duration::from_secs(3)));
    let controller = ScanController::new(acquisition, ScriptedDecoder::new(Vec::new()));
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;

    let failures = recorder.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("timed out after 3000 ms"));
    assert!(!controller.is_scanner_active());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_controller_during_acquisition_tears_down() {
    let camera = FakeCamera::hanging();
    let controller = controller(&camera, ScriptedDecoder::new(Vec::new()));
    let status = controller.subscribe();

    controller.start_scanner(ScanMode::Continuous);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(camera.acquire_count(), 1);
    assert_eq!(controller.state(), ScanState::Acquiring);

    drop(controller);
    assert!(
        status.has_changed().is_err(),
        "status channel should close once the last handle is gone"
    );
}

#[tokio::test(start_paused = true)]
async fn test_callback_may_stop_scanner() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::hits_on(&[2], "X");
    let controller = controller(&camera, decoder.clone());

    let handle = controller.clone();
    controller.set_callbacks(ScanCallbacks::new().on_scan_success(move |_| handle.stop_scanner()));

    controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;
    ticks(5).await;

    assert_eq!(controller.state(), ScanState::Idle);
    assert_eq!(decoder.attempts(), 2);
    assert_eq!(camera.live_streams(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_replaces_session() {
    let camera = FakeCamera::showing(blank_frame());
    let decoder = ScriptedDecoder::new(Vec::new());
    let controller = controller(&camera, decoder.clone());

    let first = controller.start_scanner(ScanMode::Continuous);
    settle(&controller).await;
    let second = controller.start_scanner(ScanMode::single_shot("other"));
    settle(&controller).await;

    assert_ne!(first, second);
    assert_eq!(controller.session_id(), Some(second));
    assert_eq!(camera.acquire_count(), 2);
    assert_eq!(camera.live_streams(), 1);

    // Only the new session ticks
    ticks(3).await;
    assert_eq!(decoder.attempts(), 3);
    controller.stop_scanner();
}

#[tokio::test(start_paused = true)]
async fn test_status_subscription_tracks_lifecycle() {
    let camera = FakeCamera::showing(blank_frame());
    let controller = controller(&camera, ScriptedDecoder::hits_on(&[1], "Z"));
    let mut status = controller.subscribe();

    controller.start_scanner(ScanMode::single_shot("t"));
    assert!(status.borrow_and_update().active);

    let done = status.wait_for(|s| s.ticks == 1 && !s.active).await.unwrap();
    assert_eq!(done.state, ScanState::Idle);
    assert!(done.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_with_real_decoder() {
    let camera = FakeCamera::showing(barcode_frame("4006381333931", Symbology::Ean13));
    let controller = controller(&camera, Arc::new(BarcodeDecoder::default()));
    let recorder = Recorder::default();
    controller.set_callbacks(recorder.callbacks());

    controller.start_scanner(ScanMode::single_shot("gauze"));
    settle(&controller).await;
    ticks(2).await;

    let hits = recorder.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].text, "4006381333931");
    assert_eq!(hits[0].symbology, Symbology::Ean13);
    assert_eq!(hits[0].tick, 1);
    assert_eq!(controller.state(), ScanState::Idle);
}
