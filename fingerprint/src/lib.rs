//! Cross-platform fingerprint authentication bridging.
//!
//! This crate adapts the callback-based fingerprint services of iOS, macOS,
//! Android, and Windows to a single-outstanding-call async API: one
//! [`FingerprintManager::authenticate`] call in, exactly one [`AuthOutcome`]
//! out. Hardware presence and enrollment are exposed as stateless queries.
//! All sensing and matching stays inside the operating system's biometric
//! service; this crate only serializes requests against it and maps its
//! status codes to a small stable string vocabulary.
//!
//! ```ignore
//! use fingerkit_fingerprint::FingerprintManager;
//!
//! let fingerprint = FingerprintManager::new();
//! if fingerprint.has_hardware().await && fingerprint.is_enrolled().await {
//!     let outcome = fingerprint.authenticate("Unlock your vault").await?;
//!     if outcome.is_success() {
//!         // unlocked
//!     }
//! }
//! ```

#![warn(missing_docs)]

pub mod codes;
pub mod fake;
mod session;
/// Platform-specific implementations.
mod sys;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

pub use session::{CancellationSignal, EventSink};

/// Hard failures of the bridge itself.
///
/// Ordinary biometric outcomes (failed match, lockout, cancellation, ...) are
/// never errors; they come back as [`AuthOutcome`] values.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The session task is no longer running.
    #[error("fingerprint service is no longer running")]
    ServiceStopped,
    /// The platform backend failed to register or drive a scan.
    #[error("platform error: {0}")]
    Platform(String),
}

/// A notification reported by a platform fingerprint service during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// The presented finger matched an enrolled fingerprint. Terminal.
    Succeeded,
    /// The presented finger did not match. The platform keeps listening.
    Failed,
    /// The scan ended with an error. Terminal. `code` carries one of the raw
    /// values in [`codes`].
    Error {
        /// Raw platform error code.
        code: u32,
        /// Human-readable text from the platform.
        message: String,
    },
    /// Acquisition guidance for the user. The platform keeps listening.
    Help {
        /// Raw platform help code.
        code: u32,
        /// Human-readable text from the platform.
        message: String,
    },
}

/// The outcome of one [`FingerprintManager::authenticate`] call.
///
/// Exactly one outcome is produced per call. `code` fields carry the stable
/// labels from [`codes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The finger matched an enrolled fingerprint.
    Success,
    /// The finger did not match. The scan is stopped; the caller may retry
    /// with a fresh call.
    Failed,
    /// The platform ended the scan with an error.
    Error {
        /// Mapped error label, e.g. `"lockout"`.
        code: &'static str,
        /// Raw platform-provided text.
        message: String,
    },
    /// The platform issued acquisition guidance. The scan is stopped; the
    /// caller may retry with a fresh call.
    Help {
        /// Mapped help label, e.g. `"imager_dirty"`.
        code: &'static str,
        /// Raw platform-provided text.
        message: String,
    },
    /// The request was turned away because another one is in flight.
    AppCancelled,
}

impl AuthOutcome {
    /// Whether the finger was accepted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The structured response handed to the application layer.
///
/// On failure `error` holds one of the mapped code labels or
/// [`codes::APP_CANCEL`] / [`codes::AUTHENTICATION_FAILED`], and `message`
/// holds the raw platform text when the platform provided any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthResponse {
    /// Whether authentication succeeded.
    pub success: bool,
    /// Stable error label when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw platform-provided text, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<AuthOutcome> for AuthResponse {
    fn from(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Success => Self {
                success: true,
                error: None,
                message: None,
            },
            AuthOutcome::Failed => Self {
                success: false,
                error: Some(codes::AUTHENTICATION_FAILED.to_owned()),
                message: None,
            },
            AuthOutcome::AppCancelled => Self {
                success: false,
                error: Some(codes::APP_CANCEL.to_owned()),
                message: None,
            },
            AuthOutcome::Error { code, message } | AuthOutcome::Help { code, message } => Self {
                success: false,
                error: Some(code.to_owned()),
                message: Some(message),
            },
        }
    }
}

/// A platform fingerprint service.
///
/// `authenticate` registers with the service and returns immediately; events
/// arrive later through the sink, from whatever thread the platform calls
/// back on. Implementations must not retain the sink or the signal past the
/// end of the scan.
pub trait FingerprintBackend: Send + Sync {
    /// Whether the device has a fingerprint sensor.
    fn has_hardware(&self) -> bool;

    /// Whether at least one fingerprint is enrolled.
    fn is_enrolled(&self) -> bool;

    /// Start listening for a fingerprint.
    ///
    /// `reason` is shown by backends that display a prompt and ignored by
    /// those that do not. Tripping `cancel` must stop the platform listener;
    /// a compliant platform then reports a final canceled error event.
    ///
    /// # Errors
    /// Returns [`FingerprintError::Platform`] when the scan cannot even be
    /// registered with the service.
    fn authenticate(
        &self,
        reason: &str,
        events: EventSink,
        cancel: CancellationSignal,
    ) -> Result<(), FingerprintError>;
}

/// Serializes fingerprint requests against the platform service.
///
/// At most one authentication is in flight at any time; a second call while
/// one is pending resolves immediately with [`AuthOutcome::AppCancelled`].
/// Cloning the manager shares the same session; dropping every clone shuts
/// the session task down and cancels any in-flight scan.
///
/// The constructors must run inside a tokio runtime.
#[derive(Clone)]
pub struct FingerprintManager {
    backend: Arc<dyn FingerprintBackend>,
    tx: mpsc::UnboundedSender<session::Message>,
}

impl fmt::Debug for FingerprintManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FingerprintManager").finish_non_exhaustive()
    }
}

impl FingerprintManager {
    /// Create a manager backed by the current platform's fingerprint service.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(sys::default_backend())
    }

    /// Create a manager over an explicit backend, such as a platform backend
    /// built from an app context or the [`fake`](crate::fake) one in tests.
    #[must_use]
    pub fn with_backend(backend: Arc<dyn FingerprintBackend>) -> Self {
        let tx = session::spawn(Arc::clone(&backend));
        Self { backend, tx }
    }

    /// Whether the device has a fingerprint sensor.
    #[allow(clippy::unused_async)]
    pub async fn has_hardware(&self) -> bool {
        self.backend.has_hardware()
    }

    /// Whether at least one fingerprint is enrolled.
    #[allow(clippy::unused_async)]
    pub async fn is_enrolled(&self) -> bool {
        self.backend.is_enrolled()
    }

    /// Authenticate with a fingerprint.
    ///
    /// Suspends until the platform reports a terminal event or the scan is
    /// cancelled. When a request is already in flight, resolves immediately
    /// with [`AuthOutcome::AppCancelled`] instead. There is no internal
    /// timeout.
    ///
    /// # Errors
    /// Returns [`FingerprintError`] only for hard failures: the session task
    /// being gone or the backend failing to register the scan.
    pub async fn authenticate(&self, reason: &str) -> Result<AuthOutcome, FingerprintError> {
        let (reply, result) = oneshot::channel();
        self.tx
            .send(session::Message::Authenticate {
                reason: reason.to_owned(),
                reply,
            })
            .map_err(|_| FingerprintError::ServiceStopped)?;
        result.await.map_err(|_| FingerprintError::ServiceStopped)?
    }

    /// Cancel the in-flight authentication, if any. Fire-and-forget and
    /// idempotent; the pending call resolves when the platform reports its
    /// canceled event.
    pub fn cancel(&self) {
        let _ = self.tx.send(session::Message::Cancel);
    }
}

impl Default for FingerprintManager {
    fn default() -> Self {
        Self::new()
    }
}
