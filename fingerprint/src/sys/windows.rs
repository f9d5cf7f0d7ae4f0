//! Windows fingerprint backend using `UserConsentVerifier` (Windows Hello).

use std::future::IntoFuture;

use log::error;
use windows::Security::Credentials::UI::{
    UserConsentVerificationResult, UserConsentVerifier, UserConsentVerifierAvailability,
};
use windows::core::HSTRING;

use crate::{
    CancellationSignal, EventSink, FingerprintBackend, FingerprintError, ScanEvent, codes,
};

fn availability() -> UserConsentVerifierAvailability {
    match UserConsentVerifier::CheckAvailabilityAsync() {
        Ok(op) => op
            .get()
            .unwrap_or(UserConsentVerifierAvailability::DeviceNotPresent),
        Err(err) => {
            error!("CheckAvailabilityAsync failed: {err}");
            UserConsentVerifierAvailability::DeviceNotPresent
        }
    }
}

fn translate(result: windows::core::Result<UserConsentVerificationResult>) -> ScanEvent {
    match result {
        Ok(r) if r == UserConsentVerificationResult::Verified => ScanEvent::Succeeded,
        Ok(r) if r == UserConsentVerificationResult::Canceled => ScanEvent::Error {
            code: codes::ERROR_CANCELED,
            message: "verification canceled".to_owned(),
        },
        Ok(r) if r == UserConsentVerificationResult::RetriesExhausted => ScanEvent::Error {
            code: codes::ERROR_LOCKOUT,
            message: "retries exhausted".to_owned(),
        },
        Ok(r) if r == UserConsentVerificationResult::DeviceBusy => ScanEvent::Error {
            code: codes::ERROR_HW_UNAVAILABLE,
            message: "fingerprint device busy".to_owned(),
        },
        Ok(r) if r == UserConsentVerificationResult::DeviceNotPresent => ScanEvent::Error {
            code: codes::ERROR_HW_UNAVAILABLE,
            message: "no fingerprint device".to_owned(),
        },
        Ok(r) if r == UserConsentVerificationResult::DisabledByPolicy => ScanEvent::Error {
            code: codes::ERROR_HW_UNAVAILABLE,
            message: "biometric verification disabled by policy".to_owned(),
        },
        Ok(r) if r == UserConsentVerificationResult::NotConfiguredForUser => ScanEvent::Error {
            code: codes::ERROR_UNABLE_TO_PROCESS,
            message: "no enrolled credentials for this user".to_owned(),
        },
        Ok(_) => ScanEvent::Failed,
        Err(err) => ScanEvent::Error {
            code: 0,
            message: err.to_string(),
        },
    }
}

/// Fingerprint backend backed by Windows Hello consent verification.
#[derive(Debug, Default)]
pub struct WindowsFingerprintBackend;

impl WindowsFingerprintBackend {
    /// Create the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FingerprintBackend for WindowsFingerprintBackend {
    fn has_hardware(&self) -> bool {
        availability() != UserConsentVerifierAvailability::DeviceNotPresent
    }

    fn is_enrolled(&self) -> bool {
        availability() == UserConsentVerifierAvailability::Available
    }

    fn authenticate(
        &self,
        reason: &str,
        events: EventSink,
        cancel: CancellationSignal,
    ) -> Result<(), FingerprintError> {
        let op = UserConsentVerifier::RequestVerificationAsync(&HSTRING::from(reason))
            .map_err(|e| FingerprintError::Platform(e.to_string()))?;
        let canceller = op.clone();
        tokio::spawn(async move {
            let mut verification = std::pin::pin!(op.into_future());
            let result = tokio::select! {
                result = &mut verification => result,
                () = cancel.cancelled() => {
                    if let Err(err) = canceller.Cancel() {
                        error!("cancelling consent verification failed: {err}");
                    }
                    // The operation still completes, now with Canceled.
                    verification.await
                }
            };
            events.deliver(translate(result));
        });
        Ok(())
    }
}
