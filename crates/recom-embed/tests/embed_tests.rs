use recom_core::config::ModelSettings;
use recom_core::similarity::cosine_similarity;
use recom_core::traits::Embedder;
use recom_core::Error;
use recom_embed::{get_default_embedder, vector_size_for_model, HashEmbedder};

#[test]
fn vector_size_follows_model_family() {
    assert_eq!(vector_size_for_model("sentence-transformers/all-MiniLM-L6-v2"), 384);
    assert_eq!(vector_size_for_model("sentence-transformers/all-mpnet-base-v2"), 768);
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = ModelSettings { use_fake: true, ..ModelSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let (v1, v2) = (&embs[0], &embs[1]);

    assert_eq!(v1.len(), 384, "MiniLM default maps to 384 dims");
    assert_eq!(embedder.dim(), 384);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_score_higher() {
    let embedder = HashEmbedder::new(384);
    let q = embedder.embed_text("running shoe").unwrap();
    let shoe = embedder.embed_text("Red Shoe running shoe").unwrap();
    let shirt = embedder.embed_text("Blue Shirt cotton shirt").unwrap();
    assert!(cosine_similarity(&q, &shoe) > cosine_similarity(&q, &shirt));
}

#[test]
fn empty_text_is_a_zero_vector() {
    let v = HashEmbedder::new(16).embed_text("   ").unwrap();
    assert_eq!(v.len(), 16);
    assert!(v.iter().all(|x| *x == 0.0));
}

#[test]
fn missing_model_files_are_a_config_error() {
    let settings = ModelSettings {
        name: "acme/definitely-not-downloaded".to_string(),
        dir: Some("/nonexistent/model/dir".to_string()),
        ..ModelSettings::default()
    };
    match get_default_embedder(&settings) {
        Err(Error::InvalidConfig(msg)) => assert!(msg.contains("definitely-not-downloaded"), "{msg}"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("model should not load"),
    }
}

#[test]
fn unknown_device_is_a_config_error() {
    let settings = ModelSettings { device: "tpu".to_string(), ..ModelSettings::default() };
    match get_default_embedder(&settings) {
        Err(Error::InvalidConfig(msg)) => assert!(msg.contains("tpu"), "{msg}"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("device should be rejected"),
    }
}
