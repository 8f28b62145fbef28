use crate::config::Config;
use crate::error::Result;
use crate::providers::{CompletionBackend, ProviderRouter};
use crate::store::{AstraClient, CatalogStore, DataSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all request handlers.
///
/// Collaborators sit behind trait objects so tests can swap in fakes;
/// production wiring uses one [`AstraClient`] for both data-source and
/// catalog roles and one [`ProviderRouter`] for completions and listing.
pub struct AppState {
    pub config: Arc<Config>,
    pub source: Arc<dyn DataSource>,
    pub catalog: Arc<dyn CatalogStore>,
    pub backend: Arc<dyn CompletionBackend>,
    pub providers: Arc<ProviderRouter>,
    ready: AtomicBool,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let astra = Arc::new(AstraClient::new(config.astra.clone(), timeout)?);
        let providers = Arc::new(ProviderRouter::new(&config)?);
        Ok(Self::with_collaborators(
            config,
            astra.clone(),
            astra,
            providers.clone(),
            providers,
        ))
    }

    /// Assemble state from explicit collaborators. Tests use this to
    /// inject fakes; `new` delegates here with the production wiring.
    pub fn with_collaborators(
        config: Config,
        source: Arc<dyn DataSource>,
        catalog: Arc<dyn CatalogStore>,
        backend: Arc<dyn CompletionBackend>,
        providers: Arc<ProviderRouter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            source,
            catalog,
            backend,
            providers,
            ready: AtomicBool::new(true),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
