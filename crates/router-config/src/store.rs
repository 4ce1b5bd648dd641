use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::{Config, ConfigSnapshot};

/// Holds the currently active `ConfigSnapshot` behind an `Arc`, swapped as a
/// whole on reload rather than mutated in place (spec.md §5: "Config
/// Snapshot cache... swapped by pointer").
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<ConfigSnapshot>>,
}

impl ConfigStore {
    /// Load the config file at `path` and build a store pinned to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial load fails.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = Config::load(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(config.snapshot)),
        })
    }

    /// The snapshot in effect for a request started right now.
    ///
    /// Cloning the `Arc` is cheap and gives the caller a consistent view for
    /// the lifetime of one request even if a reload races it.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.current.read().expect("config store lock poisoned"))
    }

    /// Re-read the config file from disk and swap in the new snapshot if it
    /// parses and validates; the previous snapshot stays live on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the reload fails to load or validate; the store
    /// is left unchanged.
    pub fn reload(&self) -> anyhow::Result<()> {
        let config = Config::load(&self.path)?;
        *self.current.write().expect("config store lock poisoned") = Arc::new(config.snapshot);
        Ok(())
    }
}
