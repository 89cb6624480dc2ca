//! Matting method selection and fallback execution
//!
//! The fallback chain is data, not control flow: the dispatcher builds an
//! ordered list of methods up front and a single loop executes it, recording
//! every attempt. Cloud attempts cost provider quota, so the chain is always
//! executed sequentially, never speculatively in parallel.

use crate::{
    backends::ClientRegistry,
    config::{defaults, MattingRequest},
    error::{AttemptFailure, MattingError, ProviderErrorKind, Result},
    matting::{chroma_key, flood_fill, threshold},
    types::{
        decode_png, encode_png, CloudProvider, MattingMethod, MattingResult, PixelBuffer,
    },
};
use instant::{Duration, Instant};
use log::info;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Executes matting requests, applying provider fallback on failure
///
/// Remote clients are injected through the [`ClientRegistry`]; the dispatcher
/// holds no global state and is safe to share across concurrent requests.
pub struct MattingDispatcher {
    registry: ClientRegistry,
    attempt_timeout: Duration,
}

impl MattingDispatcher {
    /// Create a dispatcher over the given client registry
    #[must_use]
    pub fn new(registry: ClientRegistry) -> Self {
        Self {
            registry,
            attempt_timeout: defaults::ATTEMPT_TIMEOUT,
        }
    }

    /// Create a dispatcher with no remote clients; cloud requests will fall
    /// back to local flood fill
    #[must_use]
    pub fn local_only() -> Self {
        Self::new(ClientRegistry::new())
    }

    /// Override the per-attempt timeout for remote calls
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Execute a matting request
    ///
    /// # Errors
    ///
    /// Returns `MattingError` for:
    /// - Corrupt input buffers
    /// - `AllMethodsExhausted` when every method in the fallback chain failed
    pub async fn matte(&self, request: MattingRequest) -> Result<MattingResult> {
        self.run(request, None).await
    }

    /// Execute a matting request, aborting when the token is cancelled
    ///
    /// Cancellation aborts the in-flight attempt and skips the remaining
    /// fallback chain; it never returns a partial result silently.
    ///
    /// # Errors
    /// - `MattingError::Cancelled` when the token fires
    /// - Otherwise as [`MattingDispatcher::matte`]
    pub async fn matte_with_cancellation(
        &self,
        request: MattingRequest,
        cancel: &CancellationToken,
    ) -> Result<MattingResult> {
        self.run(request, Some(cancel)).await
    }

    #[instrument(
        skip(self, request, cancel),
        fields(
            method = %request.method,
            dimensions = %format!("{}x{}", request.image.width, request.image.height)
        )
    )]
    async fn run(
        &self,
        request: MattingRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<MattingResult> {
        // No fail-fast validation here: a corrupt buffer must surface as a
        // recorded failure for every method in the chain, so the caller sees
        // the full attempt trace instead of a bare buffer error.
        let start = Instant::now();

        let (chain, redirected) = Self::build_chain(request.method);
        info!(
            "matting dispatch: method {} resolved to chain of {}",
            request.method,
            chain.len()
        );

        let mut image = request.image.clone();
        let mut attempted: Vec<MattingMethod> = Vec::new();
        let mut failures: Vec<AttemptFailure> = Vec::new();
        if redirected {
            // Record the redirect so callers can observe it
            attempted.push(MattingMethod::AiLocal);
        }

        for method in chain {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(MattingError::Cancelled);
                }
            }

            attempted.push(method);
            let outcome = match method {
                MattingMethod::Cloud(provider) => {
                    self.attempt_cloud(provider, &image, request.cloud_api_key.as_deref(), cancel)
                        .await
                },
                _ => Self::attempt_local(method, &mut image, &request).map(|()| None),
            };

            match outcome {
                Ok(replacement) => {
                    if let Some(matted) = replacement {
                        image = matted;
                    }
                    debug!(
                        method = %method,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "matting succeeded"
                    );
                    return Ok(MattingResult {
                        image,
                        method_used: method,
                        attempted_chain: attempted,
                    });
                },
                Err(MattingError::Cancelled) => return Err(MattingError::Cancelled),
                Err(error) => {
                    let failure = Self::to_attempt_failure(method, &error);
                    warn!(
                        method = %method,
                        kind = %failure.kind,
                        "matting attempt failed: {}",
                        failure.message
                    );
                    failures.push(failure);
                },
            }
        }

        Err(MattingError::AllMethodsExhausted { attempts: failures })
    }

    /// Resolve the requested method into an ordered fallback chain
    ///
    /// Returns the chain plus whether a deprecated-method redirect happened.
    fn build_chain(method: MattingMethod) -> (Vec<MattingMethod>, bool) {
        match method {
            MattingMethod::Auto => (vec![MattingMethod::FloodFill], false),
            MattingMethod::AiLocal => {
                // The on-device AI matter crashed its native runtime and is
                // disabled at the orchestration layer. Loud, not silent.
                warn!("ai-local matting is deprecated and disabled; redirecting to flood-fill");
                (vec![MattingMethod::FloodFill], true)
            },
            MattingMethod::FloodFill | MattingMethod::Threshold | MattingMethod::ChromaKey => {
                (vec![method], false)
            },
            MattingMethod::Cloud(provider) => {
                let mut chain = vec![MattingMethod::Cloud(provider)];
                if provider != CloudProvider::ReplicateBria {
                    chain.push(MattingMethod::Cloud(CloudProvider::ReplicateBria));
                }
                chain.push(MattingMethod::FloodFill);
                (chain, false)
            },
        }
    }

    /// Run a local algorithm in place; pure, fails only on malformed buffers
    fn attempt_local(
        method: MattingMethod,
        image: &mut PixelBuffer,
        request: &MattingRequest,
    ) -> Result<()> {
        match method {
            MattingMethod::Threshold => threshold::matte(
                image,
                &threshold::ThresholdOptions {
                    tolerance: request.tolerance,
                    edge_smoothing: request.edge_smoothing,
                    decontaminate: request.decontaminate,
                },
            ),
            MattingMethod::ChromaKey => chroma_key::matte(
                image,
                &chroma_key::ChromaKeyOptions {
                    key_color: request.chroma_color,
                    tolerance: request.tolerance,
                },
            ),
            _ => flood_fill::matte(
                image,
                &flood_fill::FloodFillOptions {
                    // Cloud fallbacks reach here with a cloud-sized tolerance;
                    // clamp to the flood-fill default in that case
                    tolerance: if matches!(request.method, MattingMethod::FloodFill) {
                        request.tolerance
                    } else {
                        defaults::FLOOD_FILL_TOLERANCE
                    },
                    edge_smoothing: request.edge_smoothing,
                },
            ),
        }
    }

    /// Run one remote attempt with timeout and optional cancellation
    async fn attempt_cloud(
        &self,
        provider: CloudProvider,
        image: &PixelBuffer,
        api_key: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<PixelBuffer>> {
        let client = self.registry.get(provider).ok_or_else(|| {
            MattingError::Provider(crate::error::ProviderFailure::new(
                provider.name(),
                ProviderErrorKind::Unsupported,
                "no client registered for provider",
            ))
        })?;

        let png = encode_png(image)?;
        let call = tokio::time::timeout(
            self.attempt_timeout,
            client.remove_background(&png, api_key),
        );

        let response = if let Some(token) = cancel {
            tokio::select! {
                () = token.cancelled() => return Err(MattingError::Cancelled),
                result = call => result,
            }
        } else {
            call.await
        };

        let bytes = match response {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(failure)) => return Err(MattingError::Provider(failure)),
            Err(_elapsed) => {
                return Err(MattingError::Provider(crate::error::ProviderFailure::new(
                    provider.name(),
                    ProviderErrorKind::Network,
                    format!(
                        "attempt timed out after {}ms",
                        self.attempt_timeout.as_millis()
                    ),
                )));
            },
        };

        let matted = decode_png(&bytes)?;
        Ok(Some(matted))
    }

    fn to_attempt_failure(method: MattingMethod, error: &MattingError) -> AttemptFailure {
        match error {
            MattingError::Provider(failure) => AttemptFailure {
                method,
                kind: failure.kind,
                message: failure.message.clone(),
            },
            other => AttemptFailure {
                method,
                kind: ProviderErrorKind::Unknown,
                message: other.to_string(),
            },
        }
    }
}
