use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router as AxumRouter;
use router_routing::SnapshotSource;
use tower_http::trace::TraceLayer;

use crate::handlers::{chat_handler, health_handler, AppState};

/// Assembled gateway: the axum router plus the address it will bind.
pub struct Server {
    router: AxumRouter,
    listen_address: SocketAddr,
}

impl Server {
    #[must_use]
    pub fn new<C: SnapshotSource + 'static>(
        state: Arc<AppState<C>>,
        listen_address: SocketAddr,
        health_enabled: bool,
        health_path: &str,
    ) -> Self {
        let mut app = AxumRouter::new();

        if health_enabled {
            app = app.route(health_path, get(health_handler));
        }

        let app = app.route("/v1/chat", post(chat_handler::<C>)).with_state(state).layer(TraceLayer::new_for_http());

        Self {
            router: app,
            listen_address,
        }
    }

    /// The configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router, for tests that manage
    /// their own listener.
    pub fn into_router(self) -> AxumRouter {
        self.router
    }

    /// Start serving requests; blocks until `shutdown` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails.
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
