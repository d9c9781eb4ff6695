//! Embedding client: batching, option resolution, documents and retry.

mod common;

use common::{fast_retry, ScriptedEmbedding};
use dashscope_ai::dashscope::TextType;
use dashscope_ai::embedding::{
    DashScopeEmbeddingClient, Document, EmbeddingClient, EmbeddingOptions, EmbeddingRequest,
    MetadataMode,
};
use dashscope_ai::Error;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn large_inputs_are_batched_with_global_indices() {
    let api = ScriptedEmbedding::new();
    let client = DashScopeEmbeddingClient::new(api.clone());

    let texts: Vec<String> = (0..30).map(|i| "x".repeat(i + 1)).collect();
    let response = client
        .call(&EmbeddingRequest::new(texts.clone(), None))
        .await
        .unwrap();

    let requests = api.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].input.texts.len(), 25);
    assert_eq!(requests[1].input.texts.len(), 5);

    assert_eq!(response.results.len(), 30);
    let indices: Vec<usize> = response.results.iter().map(|e| e.index).collect();
    assert_eq!(indices, (0..30).collect::<Vec<_>>());
    // Vector 27 is the third text of the second batch.
    assert_eq!(response.results[27].output, vec![2.0, 28.0]);
    assert_eq!(response.metadata.total_tokens, 60);
    assert_eq!(response.metadata.model, "text-embedding-v1");
}

#[tokio::test]
async fn request_options_override_client_defaults() {
    let api = ScriptedEmbedding::new();
    let client = DashScopeEmbeddingClient::builder(api.clone())
        .default_options(EmbeddingOptions::model("text-embedding-v2"))
        .build();

    client.embed("plain").await.unwrap();
    client
        .call(&EmbeddingRequest::new(
            vec!["query".into()],
            Some(EmbeddingOptions {
                model: Some("text-embedding-v3".into()),
                text_type: Some(TextType::Query),
            }),
        ))
        .await
        .unwrap();

    let requests = api.requests.lock().unwrap().clone();
    assert_eq!(requests[0].model, "text-embedding-v2");
    assert_eq!(requests[0].parameters.text_type, TextType::Document);
    assert_eq!(requests[1].model, "text-embedding-v3");
    assert_eq!(requests[1].parameters.text_type, TextType::Query);
}

#[tokio::test]
async fn documents_are_formatted_by_metadata_mode() {
    let document = Document::new("Qwen is a family of models.").with_metadata("source", "wiki");

    let api = ScriptedEmbedding::new();
    let client = DashScopeEmbeddingClient::builder(api.clone())
        .metadata_mode(MetadataMode::None)
        .build();
    let vector = client.embed_document(&document).await.unwrap();
    assert_eq!(vector, vec![0.0, "Qwen is a family of models.".len() as f64]);

    let api = ScriptedEmbedding::new();
    let client = DashScopeEmbeddingClient::builder(api.clone())
        .metadata_mode(MetadataMode::All)
        .build();
    client.embed_document(&document).await.unwrap();
    let sent = api.requests.lock().unwrap()[0].input.texts[0].clone();
    assert!(sent.contains("source: wiki"));
    assert!(sent.ends_with("Qwen is a family of models."));
}

#[tokio::test]
async fn embed_all_keeps_input_order() {
    let api = ScriptedEmbedding::new();
    let client = DashScopeEmbeddingClient::builder(api)
        .max_batch_size(2)
        .build();

    let vectors = client.embed_all(&["a", "bb", "ccc"]).await.unwrap();
    let lengths: Vec<f64> = vectors.iter().map(|v| v[1]).collect();
    assert_eq!(lengths, vec![1.0, 2.0, 3.0]);
}

#[tokio::test]
async fn dimensions_use_known_sizes_or_a_sample_call() {
    let api = ScriptedEmbedding::new();
    let known = DashScopeEmbeddingClient::new(api.clone());
    assert_eq!(known.dimensions().await.unwrap(), 1536);
    assert!(api.requests.lock().unwrap().is_empty());

    let custom = DashScopeEmbeddingClient::builder(api.clone())
        .default_options(EmbeddingOptions::model("custom-embedding"))
        .build();
    assert_eq!(custom.dimensions().await.unwrap(), 2);
    assert_eq!(api.requests.lock().unwrap()[0].input.texts, vec!["Hello World"]);
}

#[tokio::test]
async fn transient_failures_are_retried_per_batch() {
    let api = ScriptedEmbedding::new();
    api.failures_left.store(2, Ordering::SeqCst);
    let client = DashScopeEmbeddingClient::builder(api.clone())
        .retry(fast_retry(2))
        .build();

    let vector = client.embed("hello").await.unwrap();
    assert_eq!(vector, vec![0.0, 5.0]);
    assert_eq!(api.requests.lock().unwrap().len(), 3);

    api.failures_left.store(5, Ordering::SeqCst);
    let err = client.embed("hello").await.unwrap_err();
    assert!(matches!(err, Error::Vendor { status: Some(503), .. }));
}
