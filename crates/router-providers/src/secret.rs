use std::sync::atomic::{AtomicBool, Ordering};

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::OnceCell;

/// A credential record as returned by the external secret store (spec.md
/// §4.2): `current` is the active key; `previous` is kept around only long
/// enough for one retry after a key rotation.
#[derive(Clone)]
pub struct ProviderSecret {
    pub current: SecretString,
    pub previous: Option<SecretString>,
}

#[derive(Debug, Clone, Error)]
pub enum SecretError {
    #[error("secret store backend: {0}")]
    Backend(String),
    #[error("no secret registered for id {0:?}")]
    NotFound(String),
}

/// External secret store boundary (spec.md §1, §4.2). Adapters never know
/// how a credential is provisioned, only how to ask for it by id.
#[async_trait::async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch(&self, secret_id: &str) -> Result<ProviderSecret, SecretError>;
}

/// Single-flight credential cache for one adapter instance (spec.md §4.2
/// "Credential loading"): the first caller triggers the fetch, every
/// concurrent caller awaits the same in-flight future, and the fetched
/// record is never re-fetched for the adapter's lifetime — only `RotateKey`
/// retires the `previous` half of it.
pub struct SingleFlightSecret {
    store: std::sync::Arc<dyn SecretStore>,
    secret_id: String,
    cell: OnceCell<ProviderSecret>,
    previous_discarded: AtomicBool,
}

impl SingleFlightSecret {
    pub fn new(store: std::sync::Arc<dyn SecretStore>, secret_id: impl Into<String>) -> Self {
        Self {
            store,
            secret_id: secret_id.into(),
            cell: OnceCell::new(),
            previous_discarded: AtomicBool::new(false),
        }
    }

    async fn record(&self) -> Result<&ProviderSecret, SecretError> {
        self.cell
            .get_or_try_init(|| async { self.store.fetch(&self.secret_id).await })
            .await
    }

    pub async fn current(&self) -> Result<SecretString, SecretError> {
        self.record().await.map(|record| record.current.clone())
    }

    /// `previous`, unless `rotate_key` has already retired it.
    pub async fn previous(&self) -> Result<Option<SecretString>, SecretError> {
        if self.previous_discarded.load(Ordering::Acquire) {
            return Ok(None);
        }
        self.record().await.map(|record| record.previous.clone())
    }

    /// Discard `previous` after exactly one retry attempt (spec.md §4.2:
    /// "MAY retry exactly once using `previous`, then discard `previous`").
    pub fn rotate_key(&self) {
        self.previous_discarded.store(true, Ordering::Release);
    }
}
