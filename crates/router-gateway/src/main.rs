#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use router_auth::{AdmissionAuthorizer, JwtIdentityVerifier};
use router_config::{Config, ConfigStore};
use router_gateway::args::Args;
use router_gateway::handlers::AppState;
use router_gateway::secret_store::EnvSecretStore;
use router_gateway::stores::Stores;
use router_health::CircuitBreakerManager;
use router_providers::{AnthropicAdapter, OpenAiAdapter, ProviderAdapter, SecretStore};
use router_routing::ModelRouter;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // `Config` carries the static, process-lifetime fields (server/auth);
    // `ConfigStore` separately owns the hot-reloadable snapshot half
    // (spec.md §5: "swapped by pointer... on a signal").
    let config = Config::load(&args.config)?;
    let config_store = Arc::new(ConfigStore::load(&args.config)?);
    let snapshot = config_store.snapshot();

    router_telemetry::init("info", false)?;

    tracing::info!(config_path = %args.config.display(), "starting router-gateway");

    let secret_store: Arc<dyn SecretStore> = Arc::new(EnvSecretStore);
    let mut adapters: HashMap<String, Arc<dyn ProviderAdapter>> = HashMap::new();
    for (name, provider_cfg) in &snapshot.providers {
        if !provider_cfg.active {
            continue;
        }
        let adapter: Arc<dyn ProviderAdapter> = if name == "anthropic" {
            Arc::new(AnthropicAdapter::new(name.clone(), provider_cfg.clone(), Arc::clone(&secret_store)))
        } else {
            Arc::new(OpenAiAdapter::new(name.clone(), provider_cfg.clone(), Arc::clone(&secret_store)))
        };
        adapters.insert(name.clone(), adapter);
    }

    let auth_config = config.auth.as_ref().ok_or_else(|| anyhow::anyhow!("missing [auth] section in config"))?;
    let stores = Stores::build(config.server.store_url.as_deref())?;

    let verifier = Arc::new(JwtIdentityVerifier::new(&auth_config.verification_secret));
    let authorizer = Arc::new(AdmissionAuthorizer::new(verifier, Arc::clone(&stores.families), stores.profiles));

    let breaker = Arc::new(CircuitBreakerManager::new(stores.health, snapshot.circuit_breaker));
    let router = Arc::new(ModelRouter::new(config_store.clone(), adapters, breaker, stores.ledger, stores.families));

    let state = Arc::new(AppState { authorizer, router });

    let listen_address = args.listen.or(config.server.listen_address).unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));
    let gateway = router_gateway::server::Server::new(state, listen_address, config.server.health.enabled, &config.server.health.path);

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.cancel();
    });

    spawn_reload_on_sighup(Arc::clone(&config_store));

    gateway.serve(shutdown).await?;

    tracing::info!("router-gateway stopped");
    Ok(())
}

/// Re-read the config file and swap the active snapshot on `SIGHUP`
/// (spec.md §5: "we load a versioned snapshot from a file/table at startup
/// and on a signal"). A failed reload logs a warning and leaves the
/// previous snapshot live.
#[cfg(unix)]
fn spawn_reload_on_sighup(config_store: Arc<ConfigStore>) {
    tokio::spawn(async move {
        let Ok(mut sighup) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) else {
            tracing::warn!("failed to install SIGHUP handler, config hot-reload disabled");
            return;
        };
        loop {
            sighup.recv().await;
            tracing::info!("SIGHUP received, reloading config snapshot");
            if let Err(e) = config_store.reload() {
                tracing::warn!(error = %e, "config reload failed, keeping previous snapshot");
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_sighup(_config_store: Arc<ConfigStore>) {}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
