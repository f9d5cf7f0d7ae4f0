//! Manual harness for the fingerprint bridge.
//!
//! Queries the platform backend, then replays a scripted session against the
//! fake backend so the flow can be exercised on machines without a sensor.

use std::time::Duration;

use fingerkit_fingerprint::fake::FakeBackend;
use fingerkit_fingerprint::{AuthResponse, FingerprintManager, codes};

#[tokio::main]
async fn main() {
    println!("Checking fingerprint hardware...");
    let fingerprint = FingerprintManager::new();
    println!("Has hardware: {}", fingerprint.has_hardware().await);
    println!("Is enrolled: {}", fingerprint.is_enrolled().await);

    if fingerprint.is_enrolled().await {
        println!("Requesting authentication...");
        match fingerprint.authenticate("Test authentication from Rust").await {
            Ok(outcome) if outcome.is_success() => println!("✅ Authentication SUCCESS!"),
            Ok(outcome) => println!("❌ Not authenticated: {outcome:?}"),
            Err(e) => println!("❌ Authentication FAILED: {e}"),
        }
    } else {
        println!("No enrolled fingerprints; running the scripted session instead.");
        scripted_session().await;
    }
}

async fn scripted_session() {
    let (backend, controller) = FakeBackend::builder().build();
    let fingerprint = FingerprintManager::with_backend(backend);

    let pending = tokio::spawn({
        let fingerprint = fingerprint.clone();
        async move { fingerprint.authenticate("Scripted demo").await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.help(codes::ACQUIRED_PARTIAL, "Only a partial print was read");

    match pending.await.expect("demo task panicked") {
        Ok(outcome) => {
            let response = AuthResponse::from(outcome);
            println!(
                "Scripted session response: {}",
                serde_json::to_string_pretty(&response).expect("serializable response")
            );
        }
        Err(e) => println!("❌ Scripted session failed: {e}"),
    }
}
