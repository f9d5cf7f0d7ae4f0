//! Apple platform (iOS/macOS) fingerprint backend using swift-bridge.
//!
//! TouchID via `LocalAuthentication`. The Swift side evaluates the biometry
//! policy and reports back through [`ScanEventRelay`]; `LAError` raw values
//! are translated into the raw code vocabulary in [`codes`].

use std::sync::Arc;

use tokio::sync::Notify;

use crate::{
    CancellationSignal, EventSink, FingerprintBackend, FingerprintError, ScanEvent, codes,
};

#[swift_bridge::bridge]
mod ffi {
    extern "Rust" {
        type ScanEventRelay;
        fn on_succeeded(&self);
        fn on_error(&self, code: i32, message: String);
    }

    extern "Swift" {
        #[swift_bridge(rust_name = "fingerprint_has_hardware")]
        fn fingerprint_has_hardware() -> bool;

        #[swift_bridge(rust_name = "fingerprint_is_enrolled")]
        fn fingerprint_is_enrolled() -> bool;

        #[swift_bridge(rust_name = "fingerprint_authenticate")]
        fn fingerprint_authenticate(reason: &str, relay: ScanEventRelay);

        #[swift_bridge(rust_name = "fingerprint_cancel")]
        fn fingerprint_cancel();
    }
}

// LAError raw values.
const LA_ERROR_AUTHENTICATION_FAILED: i32 = -1;
const LA_ERROR_USER_CANCEL: i32 = -2;
const LA_ERROR_SYSTEM_CANCEL: i32 = -4;
const LA_ERROR_BIOMETRY_NOT_AVAILABLE: i32 = -6;
const LA_ERROR_BIOMETRY_NOT_ENROLLED: i32 = -7;
const LA_ERROR_BIOMETRY_LOCKOUT: i32 = -8;
const LA_ERROR_APP_CANCEL: i32 = -9;

/// Receives `LocalAuthentication` callbacks from the Swift side.
pub struct ScanEventRelay {
    sink: EventSink,
    done: Arc<Notify>,
}

impl ScanEventRelay {
    fn on_succeeded(&self) {
        self.sink.deliver(ScanEvent::Succeeded);
        self.done.notify_one();
    }

    fn on_error(&self, code: i32, message: String) {
        self.sink.deliver(translate_la_error(code, message));
        self.done.notify_one();
    }
}

fn translate_la_error(code: i32, message: String) -> ScanEvent {
    if code == LA_ERROR_AUTHENTICATION_FAILED {
        return ScanEvent::Failed;
    }
    let raw = match code {
        LA_ERROR_USER_CANCEL | LA_ERROR_SYSTEM_CANCEL | LA_ERROR_APP_CANCEL => {
            codes::ERROR_CANCELED
        }
        LA_ERROR_BIOMETRY_NOT_AVAILABLE | LA_ERROR_BIOMETRY_NOT_ENROLLED => {
            codes::ERROR_HW_UNAVAILABLE
        }
        LA_ERROR_BIOMETRY_LOCKOUT => codes::ERROR_LOCKOUT,
        _ => 0,
    };
    ScanEvent::Error { code: raw, message }
}

/// Fingerprint backend backed by `LocalAuthentication`.
#[derive(Debug, Default)]
pub struct AppleFingerprintBackend;

impl AppleFingerprintBackend {
    /// Create the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FingerprintBackend for AppleFingerprintBackend {
    fn has_hardware(&self) -> bool {
        ffi::fingerprint_has_hardware()
    }

    fn is_enrolled(&self) -> bool {
        ffi::fingerprint_is_enrolled()
    }

    fn authenticate(
        &self,
        reason: &str,
        events: EventSink,
        cancel: CancellationSignal,
    ) -> Result<(), FingerprintError> {
        let done = Arc::new(Notify::new());
        let relay = ScanEventRelay {
            sink: events,
            done: Arc::clone(&done),
        };
        ffi::fingerprint_authenticate(reason, relay);
        // LAContext delivers exactly one callback; the watcher lives until
        // that callback or a cancellation, whichever comes first.
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => ffi::fingerprint_cancel(),
                () = done.notified() => {}
            }
        });
        Ok(())
    }
}
