//! Fallback chain ordering, exhaustion, and attempt-trace tests
//!
//! Remote providers are scripted mocks; no test here touches the network.

use imgfinish::{
    backends::test_utils::MockMatteClient,
    ClientRegistry, CloudProvider, MattingDispatcher, MattingError, MattingMethod,
    MattingRequest, PixelBuffer, ProviderErrorKind,
};
use std::sync::Arc;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn white_image(size: u32) -> PixelBuffer {
    let mut image = PixelBuffer::blank(size, size);
    for y in 0..size {
        for x in 0..size {
            image.set_rgb(x, y, 255, 255, 255);
            image.set_alpha(x, y, 255);
        }
    }
    image
}

fn matted_png() -> Vec<u8> {
    // What a provider would return: the subject with transparent background
    let mut image = PixelBuffer::blank(8, 8);
    image.set_rgb(4, 4, 10, 10, 10);
    image.set_alpha(4, 4, 255);
    imgfinish::encode_png(&image).unwrap()
}

fn cloud_request(provider: CloudProvider) -> MattingRequest {
    MattingRequest::builder(white_image(8))
        .method(MattingMethod::Cloud(provider))
        .cloud_api_key("test-key")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_fallback_ordering_quota_then_success() {
    init_logs();
    // Pixelcut fails with Quota, Replicate/BRIA succeeds: the chain must
    // record exactly those two attempts and use the second.
    let mut registry = ClientRegistry::new();
    registry.register(Arc::new(MockMatteClient::failing(
        CloudProvider::Pixelcut,
        ProviderErrorKind::Quota,
    )));
    registry.register(Arc::new(MockMatteClient::succeeding(
        CloudProvider::ReplicateBria,
        matted_png(),
    )));
    let dispatcher = MattingDispatcher::new(registry);

    let result = dispatcher
        .matte(cloud_request(CloudProvider::Pixelcut))
        .await
        .unwrap();

    assert_eq!(
        result.attempted_chain,
        vec![
            MattingMethod::Cloud(CloudProvider::Pixelcut),
            MattingMethod::Cloud(CloudProvider::ReplicateBria),
        ]
    );
    assert_eq!(
        result.method_used,
        MattingMethod::Cloud(CloudProvider::ReplicateBria)
    );
}

#[tokio::test]
async fn test_named_provider_success_short_circuits() {
    let mut registry = ClientRegistry::new();
    let pixian = Arc::new(MockMatteClient::succeeding(
        CloudProvider::Pixian,
        matted_png(),
    ));
    let replicate = Arc::new(MockMatteClient::succeeding(
        CloudProvider::ReplicateBria,
        matted_png(),
    ));
    registry.register(pixian.clone());
    registry.register(replicate.clone());
    let dispatcher = MattingDispatcher::new(registry);

    let result = dispatcher
        .matte(cloud_request(CloudProvider::Pixian))
        .await
        .unwrap();

    assert_eq!(result.method_used, MattingMethod::Cloud(CloudProvider::Pixian));
    assert_eq!(
        result.attempted_chain,
        vec![MattingMethod::Cloud(CloudProvider::Pixian)]
    );
    assert_eq!(pixian.call_count(), 1);
    assert_eq!(replicate.call_count(), 0, "no speculative fan-out");
}

#[tokio::test]
async fn test_cloud_failure_lands_on_local_flood_fill() {
    let mut registry = ClientRegistry::new();
    registry.register(Arc::new(MockMatteClient::failing(
        CloudProvider::PhotoRoom,
        ProviderErrorKind::Auth,
    )));
    registry.register(Arc::new(MockMatteClient::failing(
        CloudProvider::ReplicateBria,
        ProviderErrorKind::Network,
    )));
    let dispatcher = MattingDispatcher::new(registry);

    let result = dispatcher
        .matte(cloud_request(CloudProvider::PhotoRoom))
        .await
        .unwrap();

    assert_eq!(result.method_used, MattingMethod::FloodFill);
    assert_eq!(
        result.attempted_chain,
        vec![
            MattingMethod::Cloud(CloudProvider::PhotoRoom),
            MattingMethod::Cloud(CloudProvider::ReplicateBria),
            MattingMethod::FloodFill,
        ]
    );
    // The fully white image was matted locally
    assert_eq!(result.image.get(4, 4)[3], 0);
}

#[tokio::test]
async fn test_exhaustion_records_all_three_attempts() {
    init_logs();
    // Flood fill only fails on a corrupt buffer, so one is smuggled past the
    // builder via the public fields; the chain must then exhaust fully.
    let corrupt = PixelBuffer {
        width: 8,
        height: 8,
        pixels: vec![0; 9],
    };
    let request = MattingRequest {
        image: corrupt,
        method: MattingMethod::Cloud(CloudProvider::Pixelcut),
        tolerance: 15,
        edge_smoothing: false,
        decontaminate: false,
        chroma_color: imgfinish::Rgb::magenta(),
        cloud_api_key: Some("test-key".to_string()),
    };

    let mut registry = ClientRegistry::new();
    registry.register(Arc::new(MockMatteClient::failing(
        CloudProvider::Pixelcut,
        ProviderErrorKind::Quota,
    )));
    registry.register(Arc::new(MockMatteClient::failing(
        CloudProvider::ReplicateBria,
        ProviderErrorKind::Network,
    )));
    let dispatcher = MattingDispatcher::new(registry);

    let error = dispatcher.matte(request).await.unwrap_err();
    match error {
        MattingError::AllMethodsExhausted { attempts } => {
            assert_eq!(attempts.len(), 3);
            assert_eq!(
                attempts[0].method,
                MattingMethod::Cloud(CloudProvider::Pixelcut)
            );
            assert_eq!(
                attempts[1].method,
                MattingMethod::Cloud(CloudProvider::ReplicateBria)
            );
            assert_eq!(attempts[2].method, MattingMethod::FloodFill);
        },
        other => panic!("expected AllMethodsExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_attempt_kinds_preserved_in_exhaustion_trace() {
    // Corrupt buffer so even the local tail of the chain fails; every hop
    // must leave a record with a non-empty diagnostic message.
    let request = MattingRequest {
        image: PixelBuffer {
            width: 4,
            height: 4,
            pixels: vec![0; 5],
        },
        method: MattingMethod::Cloud(CloudProvider::Pixian),
        tolerance: 15,
        edge_smoothing: false,
        decontaminate: false,
        chroma_color: imgfinish::Rgb::magenta(),
        cloud_api_key: Some("test-key".to_string()),
    };

    let mut registry = ClientRegistry::new();
    registry.register(Arc::new(MockMatteClient::failing(
        CloudProvider::Pixian,
        ProviderErrorKind::Auth,
    )));
    registry.register(Arc::new(MockMatteClient::failing(
        CloudProvider::ReplicateBria,
        ProviderErrorKind::Network,
    )));
    let dispatcher = MattingDispatcher::new(registry);

    let error = dispatcher.matte(request).await.unwrap_err();
    let MattingError::AllMethodsExhausted { attempts } = error else {
        panic!("expected AllMethodsExhausted");
    };
    assert_eq!(attempts.len(), 3);
    for attempt in &attempts {
        assert!(!attempt.message.is_empty());
    }
}

#[tokio::test]
async fn test_local_methods_never_touch_providers() {
    let mut registry = ClientRegistry::new();
    let pixian = Arc::new(MockMatteClient::succeeding(
        CloudProvider::Pixian,
        matted_png(),
    ));
    registry.register(pixian.clone());
    let dispatcher = MattingDispatcher::new(registry);

    for method in [
        MattingMethod::Auto,
        MattingMethod::FloodFill,
        MattingMethod::Threshold,
        MattingMethod::ChromaKey,
    ] {
        let request = MattingRequest::builder(white_image(8))
            .method(method)
            .build()
            .unwrap();
        dispatcher.matte(request).await.unwrap();
    }
    assert_eq!(pixian.call_count(), 0);
}
