//! Application context shared by all request handlers.

use std::sync::Arc;

use fc_core::config::Config;
use fc_core::events::EventBus;
use fc_db::Catalog;

use crate::delivery::DeliveryEngine;
use crate::ingest::Ingestor;
use crate::store::ArtifactStore;

/// Explicitly constructed handles passed to every handler via Axum state.
///
/// Cheap to clone: every field is a handle or an `Arc`.
#[derive(Clone)]
pub struct AppContext {
    /// Metadata catalog.
    pub catalog: Catalog,
    /// Artifact bytes under the content root.
    pub store: ArtifactStore,
    /// Immutable configuration snapshot.
    pub config: Arc<Config>,
    /// Broadcast event bus for SSE.
    pub event_bus: Arc<EventBus>,
}

impl AppContext {
    pub fn new(catalog: Catalog, store: ArtifactStore, config: Config) -> Self {
        Self {
            catalog,
            store,
            config: Arc::new(config),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// An ingestor bound to this context's catalog, store and limits.
    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(
            self.catalog.clone(),
            self.store.clone(),
            &self.config.upload,
        )
    }

    /// A delivery engine reading through this context's store.
    pub fn delivery(&self) -> DeliveryEngine {
        DeliveryEngine::new(
            self.catalog.clone(),
            self.store.clone(),
            self.config.streaming.effective_chunk_size(),
        )
    }
}
