//! Mock generation backend for local development.
//!
//! Accepts every generation request as a queued job, walks it through
//! `running` to `done` after a configurable delay and broadcasts each
//! transition to push subscribers on `/ws`.

pub mod config;
pub mod jobs;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::MockConfig;
use crate::jobs::JobStore;

/// A mock backend bound to a local port.
pub struct MockServer {
    pub addr: SocketAddr,
    pub store: Arc<JobStore>,
    handle: JoinHandle<()>,
}

impl MockServer {
    /// Bind `host:port` from the config and serve in the background.
    ///
    /// Port `0` picks a free port; read it back from [`MockServer::addr`].
    pub async fn start(config: &MockConfig) -> std::io::Result<Self> {
        let store = Arc::new(JobStore::new(config.step_delay));
        let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
        let addr = listener.local_addr()?;
        let app = routes::router(Arc::clone(&store));

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });
        tracing::info!(%addr, "Mock backend listening");

        Ok(Self { addr, store, handle })
    }

    /// Base URL for HTTP calls, e.g. `http://127.0.0.1:9000`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop serving. Open push connections are dropped.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
