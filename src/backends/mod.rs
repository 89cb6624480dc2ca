//! Remote provider adapters for matting and upscaling
//!
//! Each adapter classifies its failures exactly once, at this boundary, into
//! [`ProviderErrorKind`]. The dispatcher and engine only ever see the closed
//! kind set and never inspect message text.
//!
//! Clients are dependency-injected through [`ClientRegistry`]; there are no
//! lazily-initialized module-level singletons.

pub mod generic_cloud;
pub mod photoroom;
pub mod pixelcut;
pub mod pixian;
pub mod replicate;
pub mod test_utils;
pub mod upscale;

pub use generic_cloud::GenericCloudClient;
pub use photoroom::PhotoRoomClient;
pub use pixelcut::PixelcutClient;
pub use pixian::PixianClient;
pub use replicate::ReplicateBriaClient;
pub use upscale::{HttpUpscaleClient, RemoteUpscaleClient};

use crate::error::{ProviderErrorKind, ProviderFailure};
use crate::types::CloudProvider;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for remote background removal providers
///
/// Implementations take PNG bytes and return PNG bytes with the background
/// removed, or a single classified failure.
#[async_trait]
pub trait RemoteMatteClient: Send + Sync {
    /// Which provider this client talks to
    fn provider(&self) -> CloudProvider;

    /// Remove the background of the given PNG image
    ///
    /// # Errors
    /// - `ProviderFailure` classified as `Auth`, `Quota`, `Network`,
    ///   `Unsupported`, or `Unknown`
    async fn remove_background(
        &self,
        png: &[u8],
        api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure>;
}

/// Registry mapping providers to injected client implementations
#[derive(Default)]
pub struct ClientRegistry {
    clients: HashMap<CloudProvider, Arc<dyn RemoteMatteClient>>,
}

impl ClientRegistry {
    /// Create an empty registry; clients must be injected by the caller
    #[must_use]
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Register a client for its provider, replacing any existing one
    pub fn register(&mut self, client: Arc<dyn RemoteMatteClient>) {
        self.clients.insert(client.provider(), client);
    }

    /// Look up the client for a provider
    #[must_use]
    pub fn get(&self, provider: CloudProvider) -> Option<Arc<dyn RemoteMatteClient>> {
        self.clients.get(&provider).cloned()
    }

    /// Providers with a registered client
    #[must_use]
    pub fn available_providers(&self) -> Vec<CloudProvider> {
        self.clients.keys().copied().collect()
    }
}

/// Classify an HTTP status code into a provider error kind
///
/// Provider-specific refinements (e.g. Pixelcut's credit codes) happen in the
/// individual adapters before falling back to this mapping.
#[must_use]
pub(crate) fn classify_status(status: reqwest::StatusCode) -> ProviderErrorKind {
    match status.as_u16() {
        401 | 403 => ProviderErrorKind::Auth,
        402 | 429 => ProviderErrorKind::Quota,
        413 | 415 | 422 => ProviderErrorKind::Unsupported,
        500..=599 => ProviderErrorKind::Network,
        _ => ProviderErrorKind::Unknown,
    }
}

/// Classify a transport-level reqwest error
#[must_use]
pub(crate) fn classify_transport(error: &reqwest::Error) -> ProviderErrorKind {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        ProviderErrorKind::Network
    } else {
        ProviderErrorKind::Unknown
    }
}

/// Build the shared HTTP client used by the concrete adapters
///
/// # Errors
/// - `ProviderFailure` (`Unknown`) when the TLS backend fails to initialize
pub(crate) fn build_http_client(
    provider: CloudProvider,
    timeout: std::time::Duration,
) -> Result<reqwest::Client, ProviderFailure> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            ProviderFailure::new(
                provider.name(),
                ProviderErrorKind::Unknown,
                format!("failed to build HTTP client: {e}"),
            )
        })
}
