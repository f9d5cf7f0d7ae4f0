use std::sync::Arc;

use crate::FingerprintBackend;

#[cfg(any(target_os = "ios", target_os = "macos"))]
pub mod apple;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(any(target_os = "ios", target_os = "macos"))]
pub(crate) fn default_backend() -> Arc<dyn FingerprintBackend> {
    Arc::new(apple::AppleFingerprintBackend::new())
}

#[cfg(target_os = "android")]
pub(crate) fn default_backend() -> Arc<dyn FingerprintBackend> {
    // A working Android backend needs a JVM context; apps construct
    // `android::AndroidFingerprintBackend` and pass it to `with_backend`.
    Arc::new(android::DetachedBackend)
}

#[cfg(target_os = "windows")]
pub(crate) fn default_backend() -> Arc<dyn FingerprintBackend> {
    Arc::new(windows::WindowsFingerprintBackend::new())
}

#[cfg(not(any(
    target_os = "ios",
    target_os = "macos",
    target_os = "android",
    target_os = "windows"
)))]
pub mod stub {
    use crate::{
        CancellationSignal, EventSink, FingerprintBackend, FingerprintError, ScanEvent, codes,
    };

    /// Fallback backend for platforms without a fingerprint service.
    #[derive(Debug, Default)]
    pub struct StubBackend;

    impl FingerprintBackend for StubBackend {
        fn has_hardware(&self) -> bool {
            false
        }

        fn is_enrolled(&self) -> bool {
            false
        }

        fn authenticate(
            &self,
            _reason: &str,
            events: EventSink,
            _cancel: CancellationSignal,
        ) -> Result<(), FingerprintError> {
            // Resolve through the event path so callers still get exactly
            // one structured result.
            events.deliver(ScanEvent::Error {
                code: codes::ERROR_HW_UNAVAILABLE,
                message: "no fingerprint hardware on this platform".to_owned(),
            });
            Ok(())
        }
    }
}

#[cfg(not(any(
    target_os = "ios",
    target_os = "macos",
    target_os = "android",
    target_os = "windows"
)))]
pub(crate) fn default_backend() -> Arc<dyn FingerprintBackend> {
    Arc::new(stub::StubBackend)
}
