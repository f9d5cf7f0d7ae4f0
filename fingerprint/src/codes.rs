//! Raw fingerprint status codes and their stable bridge labels.
//!
//! The raw values follow the Android fingerprint constants, which is the
//! vocabulary scan callbacks carry in [`ScanEvent`](crate::ScanEvent); the
//! other platform backends translate their native codes into this set before
//! reporting. The label functions produce the strings the application layer
//! sees in [`AuthResponse::error`](crate::AuthResponse) and never fail:
//! unrecognized codes collapse to `"unknown"`.

/// Fingerprint hardware is unavailable.
pub const ERROR_HW_UNAVAILABLE: u32 = 1;
/// The sensor could not process the finger.
pub const ERROR_UNABLE_TO_PROCESS: u32 = 2;
/// The request ran too long and timed out.
pub const ERROR_TIMEOUT: u32 = 3;
/// Not enough device storage to complete the operation.
pub const ERROR_NO_SPACE: u32 = 4;
/// The operation was canceled.
pub const ERROR_CANCELED: u32 = 5;
/// Too many failed attempts; the sensor is locked out.
pub const ERROR_LOCKOUT: u32 = 7;

/// Only a partial fingerprint was detected.
pub const ACQUIRED_PARTIAL: u32 = 1;
/// The image was too noisy to process.
pub const ACQUIRED_INSUFFICIENT: u32 = 2;
/// The sensor needs cleaning.
pub const ACQUIRED_IMAGER_DIRTY: u32 = 3;
/// The finger moved too slowly.
pub const ACQUIRED_TOO_SLOW: u32 = 4;
/// The finger moved too quickly.
pub const ACQUIRED_TOO_FAST: u32 = 5;

/// Label reported when a second authentication request arrives while one is
/// already in flight.
pub const APP_CANCEL: &str = "app_cancel";
/// Label reported when the presented finger did not match an enrolled one.
pub const AUTHENTICATION_FAILED: &str = "authentication_failed";

/// Stable label for a terminal scan error code.
#[must_use]
pub const fn error_label(code: u32) -> &'static str {
    match code {
        ERROR_CANCELED => "user_cancel",
        ERROR_HW_UNAVAILABLE => "not_available",
        ERROR_LOCKOUT => "lockout",
        ERROR_NO_SPACE => "no_space",
        ERROR_TIMEOUT => "timeout",
        ERROR_UNABLE_TO_PROCESS => "unable_to_process",
        _ => "unknown",
    }
}

/// Stable label for a non-fatal acquisition help code.
#[must_use]
pub const fn acquired_label(code: u32) -> &'static str {
    match code {
        ACQUIRED_IMAGER_DIRTY => "imager_dirty",
        ACQUIRED_INSUFFICIENT => "insufficient",
        ACQUIRED_PARTIAL => "partial",
        ACQUIRED_TOO_FAST => "too_fast",
        ACQUIRED_TOO_SLOW => "too_slow",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_have_documented_labels() {
        assert_eq!(error_label(ERROR_CANCELED), "user_cancel");
        assert_eq!(error_label(ERROR_HW_UNAVAILABLE), "not_available");
        assert_eq!(error_label(ERROR_LOCKOUT), "lockout");
        assert_eq!(error_label(ERROR_NO_SPACE), "no_space");
        assert_eq!(error_label(ERROR_TIMEOUT), "timeout");
        assert_eq!(error_label(ERROR_UNABLE_TO_PROCESS), "unable_to_process");
    }

    #[test]
    fn help_codes_have_documented_labels() {
        assert_eq!(acquired_label(ACQUIRED_IMAGER_DIRTY), "imager_dirty");
        assert_eq!(acquired_label(ACQUIRED_INSUFFICIENT), "insufficient");
        assert_eq!(acquired_label(ACQUIRED_PARTIAL), "partial");
        assert_eq!(acquired_label(ACQUIRED_TOO_FAST), "too_fast");
        assert_eq!(acquired_label(ACQUIRED_TOO_SLOW), "too_slow");
    }

    #[test]
    fn unrecognized_codes_collapse_to_unknown() {
        assert_eq!(error_label(0), "unknown");
        assert_eq!(error_label(6), "unknown");
        assert_eq!(error_label(9999), "unknown");
        assert_eq!(acquired_label(0), "unknown");
        assert_eq!(acquired_label(6), "unknown");
        assert_eq!(acquired_label(9999), "unknown");
    }
}
