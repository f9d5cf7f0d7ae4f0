//! End-to-end tests of the authentication session layer, driven through the
//! scripted fake backend.

use std::time::Duration;

use fingerkit_fingerprint::fake::{FakeBackend, FakeController};
use fingerkit_fingerprint::{AuthOutcome, AuthResponse, FingerprintManager, codes};
use serde_json::json;
use tokio::task::JoinHandle;

type PendingAuth = JoinHandle<Result<AuthOutcome, fingerkit_fingerprint::FingerprintError>>;

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

/// Starts an authentication and waits until the backend has registered it.
async fn start_auth(manager: &FingerprintManager, controller: &FakeController) -> PendingAuth {
    let scans_before = controller.scans_started();
    let pending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.authenticate("unlock").await }
    });
    wait_until(|| controller.scans_started() > scans_before).await;
    pending
}

#[tokio::test]
async fn queries_reflect_backend_state() {
    let (backend, _controller) = FakeBackend::builder()
        .hardware(true)
        .enrolled(false)
        .build();
    let manager = FingerprintManager::with_backend(backend);

    assert!(manager.has_hardware().await);
    assert!(!manager.is_enrolled().await);
}

#[tokio::test]
async fn successful_scan_resolves_with_success() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let pending = start_auth(&manager, &controller).await;
    assert_eq!(controller.last_reason(), "unlock");

    controller.succeed();
    let outcome = pending.await.unwrap().unwrap();
    assert!(outcome.is_success());
    assert_eq!(
        serde_json::to_value(AuthResponse::from(outcome)).unwrap(),
        json!({ "success": true })
    );
}

#[tokio::test]
async fn failed_match_resolves_and_stops_the_scan() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let pending = start_auth(&manager, &controller).await;
    controller.fail();

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(outcome, AuthOutcome::Failed);
    assert_eq!(
        serde_json::to_value(AuthResponse::from(outcome)).unwrap(),
        json!({ "success": false, "error": "authentication_failed" })
    );
    // A failed match does not end the platform scan by itself; the session
    // layer must have tripped the cancellation handle.
    wait_until(|| controller.is_cancelled()).await;
}

#[tokio::test]
async fn help_resolves_and_stops_the_scan() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let pending = start_auth(&manager, &controller).await;
    controller.help(codes::ACQUIRED_IMAGER_DIRTY, "Sensor is dirty");

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        AuthOutcome::Help {
            code: "imager_dirty",
            message: "Sensor is dirty".to_owned(),
        }
    );
    wait_until(|| controller.is_cancelled()).await;
}

#[tokio::test]
async fn platform_error_carries_mapped_code_and_raw_message() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let pending = start_auth(&manager, &controller).await;
    controller.error(codes::ERROR_LOCKOUT, "Too many attempts. Try again later.");

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(AuthResponse::from(outcome)).unwrap(),
        json!({
            "success": false,
            "error": "lockout",
            "message": "Too many attempts. Try again later.",
        })
    );
}

#[tokio::test]
async fn every_error_code_maps_to_its_label() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let table = [
        (codes::ERROR_CANCELED, "user_cancel"),
        (codes::ERROR_HW_UNAVAILABLE, "not_available"),
        (codes::ERROR_LOCKOUT, "lockout"),
        (codes::ERROR_NO_SPACE, "no_space"),
        (codes::ERROR_TIMEOUT, "timeout"),
        (codes::ERROR_UNABLE_TO_PROCESS, "unable_to_process"),
        (42, "unknown"),
    ];
    for (raw, label) in table {
        let pending = start_auth(&manager, &controller).await;
        controller.error(raw, "detail");
        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Error {
                code: label,
                message: "detail".to_owned(),
            }
        );
    }
}

#[tokio::test]
async fn every_help_code_maps_to_its_label() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let table = [
        (codes::ACQUIRED_IMAGER_DIRTY, "imager_dirty"),
        (codes::ACQUIRED_INSUFFICIENT, "insufficient"),
        (codes::ACQUIRED_PARTIAL, "partial"),
        (codes::ACQUIRED_TOO_FAST, "too_fast"),
        (codes::ACQUIRED_TOO_SLOW, "too_slow"),
        (42, "unknown"),
    ];
    for (raw, label) in table {
        let pending = start_auth(&manager, &controller).await;
        controller.help(raw, "guidance");
        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(
            outcome,
            AuthOutcome::Help {
                code: label,
                message: "guidance".to_owned(),
            }
        );
    }
}

#[tokio::test]
async fn busy_sensor_turns_the_second_call_away() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let first = start_auth(&manager, &controller).await;

    // The second call resolves immediately; the first stays pending.
    let second = manager.authenticate("unlock").await.unwrap();
    assert_eq!(second, AuthOutcome::AppCancelled);
    assert_eq!(
        serde_json::to_value(AuthResponse::from(second)).unwrap(),
        json!({ "success": false, "error": "app_cancel" })
    );
    assert!(!first.is_finished());

    // The first caller still receives its own session's outcome, and no
    // second platform scan was ever started.
    controller.succeed();
    let outcome = first.await.unwrap().unwrap();
    assert!(outcome.is_success());
    assert_eq!(controller.scans_started(), 1);
}

#[tokio::test]
async fn cancel_resolves_through_the_platform_callback() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let pending = start_auth(&manager, &controller).await;
    manager.cancel();

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        AuthOutcome::Error {
            code: "user_cancel",
            message: "fingerprint operation canceled".to_owned(),
        }
    );
    assert!(controller.is_cancelled());
}

#[tokio::test]
async fn cancel_without_a_session_is_a_noop() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    manager.cancel();
    manager.cancel();

    // The service is still fully functional afterwards.
    let pending = start_auth(&manager, &controller).await;
    controller.succeed();
    assert!(pending.await.unwrap().unwrap().is_success());
}

#[tokio::test]
async fn late_events_from_finished_scans_are_dropped() {
    let (backend, controller) = FakeBackend::builder().build();
    let manager = FingerprintManager::with_backend(backend);

    let pending = start_auth(&manager, &controller).await;
    controller.succeed();
    assert!(pending.await.unwrap().unwrap().is_success());

    // A duplicate terminal event for the finished scan must not leak into
    // the next session.
    controller.succeed();
    let pending = start_auth(&manager, &controller).await;
    controller.error(codes::ERROR_TIMEOUT, "timed out");
    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        AuthOutcome::Error {
            code: "timeout",
            message: "timed out".to_owned(),
        }
    );
}

#[tokio::test]
async fn dropping_the_manager_releases_the_scan() {
    let (backend, controller) = FakeBackend::builder().notify_on_cancel(false).build();
    let manager = FingerprintManager::with_backend(backend);

    let pending = start_auth(&manager, &controller).await;
    pending.abort();
    drop(manager);

    wait_until(|| controller.is_cancelled()).await;
}

#[tokio::test]
async fn silent_platform_leaves_cancelled_call_pending() {
    let (backend, controller) = FakeBackend::builder().notify_on_cancel(false).build();
    let manager = FingerprintManager::with_backend(backend);

    let pending = start_auth(&manager, &controller).await;
    manager.cancel();
    wait_until(|| controller.is_cancelled()).await;

    // No canceled event arrives from this platform, so the call stays
    // pending until the platform says otherwise.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!pending.is_finished());

    controller.error(codes::ERROR_CANCELED, "canceled");
    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        AuthOutcome::Error {
            code: "user_cancel",
            message: "canceled".to_owned(),
        }
    );
}
