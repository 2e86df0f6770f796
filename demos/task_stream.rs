//! # Example: task_stream
//!
//! Opens the task stream of a backend, prints registry changes and fetches the
//! audit detail of every task that reaches a terminal state.
//!
//! ## Flow
//! ```text
//! StreamHub::open(backend) ─► StreamSession
//!   ├─► registry.subscribe() ─► RegistryChange
//!   │       └─ Terminal ─► backend.task_audit(id)
//!   └─► session.wait() ─► StreamEnd (no automatic reconnect)
//! ```
//!
//! ## Run
//! ```bash
//! COPILOT_BACKEND=http://localhost:8080/api COPILOT_TENANT=acme \
//!     cargo run --example task_stream
//! ```

use copilot_core::{
    ActorRole, BackendClient, CallContext, ChangeKind, Config, StreamHub,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env();
    let base = std::env::var("COPILOT_BACKEND").unwrap_or_else(|_| "http://localhost:8080/api".into());
    let tenant = std::env::var("COPILOT_TENANT").unwrap_or_else(|_| "acme".into());

    let ctx = CallContext::new(&tenant, ActorRole::Viewer, false)?;
    let backend = BackendClient::new(&base, ctx, &cfg)?;
    let hub = StreamHub::new(cfg);

    // Failing to open is the one error the stream layer surfaces.
    let session = hub.open(&backend).await?;
    let mut changes = session.registry().subscribe();

    let watcher = {
        let registry = session.registry().clone();
        let backend = backend.clone();
        tokio::spawn(async move {
            while let Ok(change) = changes.recv().await {
                match change.kind {
                    ChangeKind::Upserted => {
                        if let Some(rec) = registry.get(&change.id).await {
                            tracing::info!(id = %rec.id, status = rec.status.as_str(), progress = rec.progress, "task");
                        }
                    }
                    ChangeKind::Terminal(status) => {
                        tracing::info!(id = %change.id, status = status.as_str(), "task finished");
                        match backend.task_audit(&change.id).await {
                            Ok(audit) => tracing::info!(id = %change.id, %audit, "audit"),
                            Err(e) => tracing::warn!(id = %change.id, error = %e, "audit unavailable"),
                        }
                    }
                    ChangeKind::Evicted => tracing::info!(id = %change.id, "task evicted"),
                }
            }
        })
    };

    let end = tokio::select! {
        end = session.wait() => end,
        _ = tokio::signal::ctrl_c() => {
            session.close().await;
            session.wait().await
        }
    };
    tracing::info!(?end, "stream finished");
    watcher.abort();
    Ok(())
}
