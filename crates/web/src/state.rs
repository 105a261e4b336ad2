//! Application state shared across handlers.

use std::path::Path;
use std::sync::Arc;

use crate::config::GargeConfig;
use crate::content::{ContentError, ContentStore};
use crate::garge::{GargeClient, GargeError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to build API client: {0}")]
    Client(#[from] GargeError),
    #[error("failed to load content: {0}")]
    Content(#[from] ContentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the API client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: GargeConfig,
    garge: GargeClient,
    content: ContentStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the API client from `config.api` and loads the markdown
    /// pages under `content_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built or the content
    /// directory cannot be read.
    pub fn new(config: GargeConfig, content_dir: &Path) -> Result<Self, StateError> {
        let garge = GargeClient::new(&config.api)?;
        let content = ContentStore::load(content_dir)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                garge,
                content,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &GargeConfig {
        &self.inner.config
    }

    /// Get a reference to the Garge API client.
    #[must_use]
    pub fn garge(&self) -> &GargeClient {
        &self.inner.garge
    }

    /// Get a reference to the markdown content store.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.inner.content
    }
}
