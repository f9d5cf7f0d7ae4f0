//! # Fingerkit
//!
//! A cross-platform fingerprint authentication kit.
//!
//! Fingerkit bridges the operating system's fingerprint service (TouchID,
//! Android fingerprint, Windows Hello) into a unified async API: hardware
//! and enrollment queries plus a single-outstanding-call authentication
//! surface with stable error codes.
//!
//! ## Features
//!
//! - `fingerprint`: fingerprint sensor queries and authentication.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! fingerkit = { version = "0.1", features = ["fingerprint"] }
//! ```
//!
//! ```ignore
//! use fingerkit::fingerprint::FingerprintManager;
//!
//! async fn unlock() {
//!     let fingerprint = FingerprintManager::new();
//!     if fingerprint.is_enrolled().await {
//!         let outcome = fingerprint.authenticate("Unlock your notes").await;
//!         println!("authenticated: {outcome:?}");
//!     }
//! }
//! ```

#[cfg(feature = "fingerprint")]
pub use fingerkit_fingerprint as fingerprint;
