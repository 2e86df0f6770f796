//! # Example: resilient_call
//!
//! A flaky live call is retried once, then replaced by mock data while a
//! [`LogObserver`] and a banner receiver learn about the degradation.
//!
//! ## Flow
//! ```text
//! execute_named("contacts.list")
//!   ├─► attempt 1 → Err(transport)
//!   ├─► sleep(500ms)
//!   ├─► attempt 2 → Err(transport)
//!   ├─► notifier.emit(DegradationEvent)   ─► LogObserver / banner
//!   └─► mock() → CallOutcome::Degraded
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example resilient_call
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use copilot_core::{
    CallError, CallOutcome, Config, DegradationNotifier, LogObserver, ResilientExecutor,
};
use tracing_subscriber::EnvFilter;

static ATTEMPTS: AtomicU32 = AtomicU32::new(0);

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Defaults plus COPILOT_* overrides from the environment / .env
    let cfg = Config::from_env();

    // 2. Notifier with a logging observer and a banner receiver
    let notifier = DegradationNotifier::from_config(&cfg);
    notifier.register(Arc::new(LogObserver::new())).keep();
    let mut banner = notifier.subscribe();

    // 3. Executor
    let exec = ResilientExecutor::new(&cfg, notifier);

    let outcome = exec
        .execute_named(
            "contacts.list",
            || async {
                let attempt = ATTEMPTS.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!(attempt, "calling live backend");
                Err::<Vec<String>, _>(CallError::transport("connection refused"))
            },
            || async { Ok(vec!["Ada Lovelace".to_string(), "Grace Hopper".to_string()]) },
        )
        .await;

    match &outcome {
        CallOutcome::Fresh(v) => tracing::info!(?v, "live data"),
        CallOutcome::Degraded { value, reason } => tracing::info!(?value, %reason, "mock data"),
        CallOutcome::Sentinel { reason, .. } => tracing::info!(%reason, "sentinel"),
    }

    if let Ok(ev) = banner.recv().await {
        tracing::info!(seq = ev.seq, "banner: working with sample data ({})", ev.reason);
    }
}
