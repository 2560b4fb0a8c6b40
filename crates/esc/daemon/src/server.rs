//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};
use crate::event_log::EventLog;
use esc_controller::{Controller, EventRecorder, UserlandReconciler};
use esc_store::InMemoryStore;
use esc_types::TypeRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Event source name on recorded events
const EVENT_SOURCE: &str = "userland-controller";

type UserlandController = Controller<InMemoryStore, UserlandReconciler<InMemoryStore>>;

/// ESC Daemon Server
pub struct Server {
    config: DaemonConfig,
    store: Arc<InMemoryStore>,
    registry: Arc<TypeRegistry>,
    recorder: EventRecorder,
    controller: Arc<UserlandController>,
    event_log: Arc<EventLog>,
    shutdown_tx: watch::Sender<bool>,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store = Arc::new(InMemoryStore::new());
        let registry = Arc::new(TypeRegistry::standard());
        let recorder = EventRecorder::new(EVENT_SOURCE);

        let reconciler = Arc::new(UserlandReconciler::new(
            store.clone(),
            registry.clone(),
            recorder.clone(),
        ));
        reconciler.setup().await?;

        let controller = Arc::new(Controller::new(
            store.clone(),
            reconciler,
            registry.clone(),
            config.controller.to_controller_config(),
        ));

        let event_log = Arc::new(EventLog::new(config.server.event_log_capacity));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            store,
            registry,
            recorder,
            controller,
            event_log,
            shutdown_tx,
        })
    }

    /// Shared state handed to the API handlers
    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.store.clone(),
            self.registry.clone(),
            self.event_log.clone(),
            self.recorder.clone(),
            self.controller.stats(),
            self.controller.queue(),
            self.shutdown_tx.clone(),
        )
    }

    /// Run the server until a signal or an API shutdown request
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let app = create_router(self.app_state(), self.config.server.enable_cors);

        // Record events before the controller starts producing them
        let event_log = self.event_log.clone();
        let events = self.recorder.subscribe();
        tokio::spawn(async move {
            event_log.collect_from(events).await;
        });

        let controller = self.controller.clone();
        let controller_shutdown = self.shutdown_tx.subscribe();
        let controller_task = tokio::spawn(async move {
            controller.run(controller_shutdown).await;
        });

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("ESC daemon listening on {}", addr);

        let mut api_shutdown = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {}
                    _ = api_shutdown.wait_for(|stop| *stop) => {}
                }
            })
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("ESC daemon shutting down");

        self.shutdown_tx.send_replace(true);
        if let Err(e) = controller_task.await {
            tracing::error!(error = %e, "Controller task failed");
        }

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
