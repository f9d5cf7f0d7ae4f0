//! Scripted fingerprint backend for exercising the session layer without
//! sensor hardware.
//!
//! The backend records every scan the session layer registers; the paired
//! controller injects platform events into the newest scan and inspects what
//! the backend saw.
//!
//! ```ignore
//! let (backend, controller) = FakeBackend::builder().build();
//! let fingerprint = FingerprintManager::with_backend(backend);
//!
//! let pending = tokio::spawn(async move { fingerprint.authenticate("demo").await });
//! controller.succeed();
//! assert!(pending.await??.is_success());
//! ```

use std::sync::{Arc, Mutex};

use crate::{
    CancellationSignal, EventSink, FingerprintBackend, FingerprintError, ScanEvent, codes,
};

/// Configures a [`FakeBackend`] before it is built.
#[derive(Debug)]
pub struct FakeBackendBuilder {
    hardware: bool,
    enrolled: bool,
    notify_on_cancel: bool,
}

impl FakeBackendBuilder {
    /// Whether the fake device reports a fingerprint sensor.
    #[must_use]
    pub const fn hardware(mut self, present: bool) -> Self {
        self.hardware = present;
        self
    }

    /// Whether the fake device reports enrolled fingerprints.
    #[must_use]
    pub const fn enrolled(mut self, enrolled: bool) -> Self {
        self.enrolled = enrolled;
        self
    }

    /// Whether tripping a scan's cancellation handle makes the fake report
    /// the platform's canceled error event, the way a compliant service
    /// does. On by default; turn off to emulate a platform that stays
    /// silent after cancellation.
    #[must_use]
    pub const fn notify_on_cancel(mut self, notify: bool) -> Self {
        self.notify_on_cancel = notify;
        self
    }

    /// Build the backend and its controller.
    #[must_use]
    pub fn build(self) -> (Arc<FakeBackend>, FakeController) {
        let shared = Arc::new(Shared {
            hardware: self.hardware,
            enrolled: self.enrolled,
            notify_on_cancel: self.notify_on_cancel,
            scans: Mutex::new(Vec::new()),
        });
        (
            Arc::new(FakeBackend {
                shared: Arc::clone(&shared),
            }),
            FakeController { shared },
        )
    }
}

#[derive(Debug)]
struct Shared {
    hardware: bool,
    enrolled: bool,
    notify_on_cancel: bool,
    scans: Mutex<Vec<Scan>>,
}

#[derive(Debug, Clone)]
struct Scan {
    reason: String,
    sink: EventSink,
    signal: CancellationSignal,
}

/// In-memory [`FingerprintBackend`] with scripted behavior.
#[derive(Debug)]
pub struct FakeBackend {
    shared: Arc<Shared>,
}

impl FakeBackend {
    /// Start configuring a fake backend. Defaults: hardware present,
    /// enrolled, compliant cancellation.
    #[must_use]
    pub const fn builder() -> FakeBackendBuilder {
        FakeBackendBuilder {
            hardware: true,
            enrolled: true,
            notify_on_cancel: true,
        }
    }
}

impl FingerprintBackend for FakeBackend {
    fn has_hardware(&self) -> bool {
        self.shared.hardware
    }

    fn is_enrolled(&self) -> bool {
        self.shared.enrolled
    }

    fn authenticate(
        &self,
        reason: &str,
        events: EventSink,
        cancel: CancellationSignal,
    ) -> Result<(), FingerprintError> {
        if self.shared.notify_on_cancel {
            let sink = events.clone();
            let signal = cancel.clone();
            tokio::spawn(async move {
                signal.cancelled().await;
                sink.deliver(ScanEvent::Error {
                    code: codes::ERROR_CANCELED,
                    message: "fingerprint operation canceled".to_owned(),
                });
            });
        }
        self.shared.scans.lock().expect("poisoned scan log").push(Scan {
            reason: reason.to_owned(),
            sink: events,
            signal: cancel,
        });
        Ok(())
    }
}

/// Scripts and inspects a [`FakeBackend`].
///
/// The injection methods act on the newest scan and panic when no scan has
/// been registered yet.
#[derive(Debug)]
pub struct FakeController {
    shared: Arc<Shared>,
}

impl FakeController {
    fn last_scan(&self) -> Scan {
        self.shared
            .scans
            .lock()
            .expect("poisoned scan log")
            .last()
            .cloned()
            .expect("no fingerprint scan registered")
    }

    /// Report a successful match.
    pub fn succeed(&self) {
        self.last_scan().sink.deliver(ScanEvent::Succeeded);
    }

    /// Report a failed match attempt.
    pub fn fail(&self) {
        self.last_scan().sink.deliver(ScanEvent::Failed);
    }

    /// Report a terminal error with a raw platform code.
    pub fn error(&self, code: u32, message: &str) {
        self.last_scan().sink.deliver(ScanEvent::Error {
            code,
            message: message.to_owned(),
        });
    }

    /// Report acquisition guidance with a raw platform code.
    pub fn help(&self, code: u32, message: &str) {
        self.last_scan().sink.deliver(ScanEvent::Help {
            code,
            message: message.to_owned(),
        });
    }

    /// How many scans the session layer has registered.
    #[must_use]
    pub fn scans_started(&self) -> usize {
        self.shared.scans.lock().expect("poisoned scan log").len()
    }

    /// The prompt reason of the newest scan.
    #[must_use]
    pub fn last_reason(&self) -> String {
        self.last_scan().reason
    }

    /// Whether the newest scan's cancellation handle has been tripped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.last_scan().signal.is_cancelled()
    }
}
