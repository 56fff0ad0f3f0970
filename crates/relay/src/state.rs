use std::sync::Arc;

use slidepilot_backend::channel::{PushChannel, PushChannelConfig};
use slidepilot_core::settings::SettingsStore;

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::hub::ContextHub;
use crate::poller::Poller;
use crate::registry::SubscriptionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Persisted backend URL overrides.
    pub settings: Arc<SettingsStore>,
    /// Connected page contexts.
    pub hub: Arc<ContextHub>,
    /// Job-to-context subscriptions.
    pub registry: Arc<SubscriptionRegistry>,
    /// Push channel to the backend.
    pub push: Arc<PushChannel>,
    /// Poll fallback loops.
    pub poller: Arc<Poller>,
    /// Forwards page-context requests to the backend.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Wire the relay components together.
    ///
    /// The hub delivers notifications, the registry receives push updates.
    /// Nothing connects yet; call `push.connect()` once serving.
    pub fn new(config: ServerConfig, settings: SettingsStore) -> Self {
        let settings = Arc::new(settings);
        let hub = Arc::new(ContextHub::new());
        let registry = Arc::new(SubscriptionRegistry::new(hub.clone()));
        let push = PushChannel::new(
            Arc::clone(&settings),
            registry.clone(),
            PushChannelConfig {
                reconnect_delay: config.push_reconnect_delay,
            },
        );
        let poller = Arc::new(Poller::new(Arc::clone(&registry), config.poll_interval));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&settings),
            reqwest::Client::new(),
            Arc::clone(&registry),
            Arc::clone(&push),
            Arc::clone(&poller),
        ));

        Self {
            config: Arc::new(config),
            settings,
            hub,
            registry,
            push,
            poller,
            dispatcher,
        }
    }

    /// Stop the push channel and poll loops, then close every page context.
    pub async fn shutdown(&self) {
        self.push.shutdown().await;
        tracing::info!("Push channel shut down");

        self.poller.shutdown().await;
        tracing::info!("Poll loops stopped");

        let count = self.hub.connection_count().await;
        tracing::info!(count, "Closing remaining page-context connections");
        self.hub.shutdown_all().await;
    }
}
