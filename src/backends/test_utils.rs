//! Scriptable mock clients for dispatcher and engine tests
//!
//! These never touch the network: each mock is scripted at construction to
//! succeed with fixed bytes, fail with a classified kind, or hang until the
//! caller's timeout or cancellation fires.

use crate::{
    backends::{RemoteMatteClient, RemoteUpscaleClient},
    error::{ProviderErrorKind, ProviderFailure},
    types::CloudProvider,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted behavior for a mock client
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return these bytes
    Succeed(Vec<u8>),
    /// Fail with this classified kind
    Fail(ProviderErrorKind),
    /// Sleep this long, then fail with `Network` (exercises timeouts)
    Hang(Duration),
}

/// Mock matting client with scripted behavior and a call counter
pub struct MockMatteClient {
    provider: CloudProvider,
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockMatteClient {
    /// Mock that returns the given PNG bytes
    #[must_use]
    pub fn succeeding(provider: CloudProvider, png: Vec<u8>) -> Self {
        Self {
            provider,
            behavior: MockBehavior::Succeed(png),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock that fails with the given kind
    #[must_use]
    pub fn failing(provider: CloudProvider, kind: ProviderErrorKind) -> Self {
        Self {
            provider,
            behavior: MockBehavior::Fail(kind),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock that sleeps before failing, to exercise timeout handling
    #[must_use]
    pub fn hanging(provider: CloudProvider, delay: Duration) -> Self {
        Self {
            provider,
            behavior: MockBehavior::Hang(delay),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times this mock has been called
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteMatteClient for MockMatteClient {
    fn provider(&self) -> CloudProvider {
        self.provider
    }

    async fn remove_background(
        &self,
        _png: &[u8],
        _api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Succeed(bytes) => Ok(bytes.clone()),
            MockBehavior::Fail(kind) => Err(ProviderFailure::new(
                self.provider.name(),
                *kind,
                "scripted failure",
            )),
            MockBehavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Err(ProviderFailure::new(
                    self.provider.name(),
                    ProviderErrorKind::Network,
                    "scripted hang elapsed",
                ))
            },
        }
    }
}

/// Mock upscale client with scripted behavior and a call counter
pub struct MockUpscaleClient {
    behavior: MockBehavior,
    calls: AtomicUsize,
}

impl MockUpscaleClient {
    /// Mock that returns the given PNG bytes
    #[must_use]
    pub fn succeeding(png: Vec<u8>) -> Self {
        Self {
            behavior: MockBehavior::Succeed(png),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock that fails with the given kind
    #[must_use]
    pub fn failing(kind: ProviderErrorKind) -> Self {
        Self {
            behavior: MockBehavior::Fail(kind),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times this mock has been called
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteUpscaleClient for MockUpscaleClient {
    fn name(&self) -> &str {
        "mock-upscaler"
    }

    async fn upscale(
        &self,
        _png: &[u8],
        _factor: u32,
        _api_key: Option<&str>,
    ) -> Result<Vec<u8>, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Succeed(bytes) => Ok(bytes.clone()),
            MockBehavior::Fail(kind) => Err(ProviderFailure::new(
                "mock-upscaler",
                *kind,
                "scripted failure",
            )),
            MockBehavior::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Err(ProviderFailure::new(
                    "mock-upscaler",
                    ProviderErrorKind::Network,
                    "scripted hang elapsed",
                ))
            },
        }
    }
}
