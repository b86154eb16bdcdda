use std::sync::Arc;

use recom_core::catalog::Catalog;
use recom_core::config::Settings;
use recom_core::traits::{Embedder, SimilarityBackend};
use recom_core::types::BackendKind;
use recom_core::Error;
use recom_embed::HashEmbedder;
use recom_engine::{Recommender, RecommenderService};
use recom_ingest::{ingest_local, ingest_remote, IngestMode, IngestOptions, LocalArtifacts};
use recom_local::{IndexOptions, LocalIndex};
use recom_remote::{MemoryStore, RemoteIndex};

const SHOES: &str = "product_id,product_name,description\n\
1,Red Shoe,running shoe\n\
2,Blue Shoe,running shoe\n\
3,Blue Shirt,cotton shirt\n";

fn shoes() -> Catalog {
    Catalog::from_reader(SHOES.as_bytes()).expect("catalog")
}

fn big_catalog(n: usize) -> Catalog {
    let mut csv = String::from("product_id,product_name,description\n");
    let words = ["shoe", "shirt", "sock", "hat", "running", "cotton", "wool"];
    for i in 0..n {
        csv.push_str(&format!("{i},Item {i},{} {}\n", words[i % words.len()], words[(i / 2) % words.len()]));
    }
    Catalog::from_reader(csv.as_bytes()).expect("catalog")
}

fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(384))
}

fn local_recommender(catalog: &Catalog, skip_top_match: bool) -> Recommender {
    let embedder = embedder();
    let rows = embedder.embed_batch(&catalog.embedding_inputs()).unwrap();
    let opts = IndexOptions { skip_top_match, ..IndexOptions::default() };
    let index = LocalIndex::from_rows(catalog.names(), &rows, opts).unwrap();
    Recommender::new(embedder, Arc::new(index), 5).unwrap()
}

#[tokio::test]
async fn blank_queries_return_nothing() {
    let rec = local_recommender(&shoes(), true);
    assert!(rec.recommend("").await.unwrap().is_empty());
    assert!(rec.recommend("   ").await.unwrap().is_empty());
    assert!(rec.recommend("\t\n").await.unwrap().is_empty());
}

#[tokio::test]
async fn results_are_capped_and_ordered() {
    let rec = local_recommender(&big_catalog(30), true);
    for q in ["running shoe", "wool hat", "cotton", "something unrelated"] {
        let out = rec.recommend(q).await.unwrap();
        assert_eq!(out.len(), 5, "query {q}");
        assert!(out.windows(2).all(|w| w[0].score >= w[1].score), "query {q}: {out:?}");
        assert!(out.iter().all(|r| (-1.0..=1.0).contains(&r.score)));
    }
}

#[tokio::test]
async fn shoes_outrank_shirt_locally() {
    let names = |skip: bool| async move {
        local_recommender(&shoes(), skip)
            .recommend("running shoe")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect::<Vec<_>>()
    };

    let all = names(false).await;
    assert_eq!(all.len(), 3);
    assert!(all[..2].iter().all(|n| n.ends_with("Shoe")), "{all:?}");
    assert_eq!(all[2], "Blue Shirt");

    let skipped = names(true).await;
    assert_eq!(skipped.len(), 2, "top match is dropped");
    assert!(skipped[0].ends_with("Shoe"));
    assert_eq!(skipped[1], "Blue Shirt");
}

#[tokio::test]
async fn shoes_outrank_shirt_remotely() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let embedder = embedder();
    let index = RemoteIndex::new(MemoryStore::new(), "products");
    ingest_remote(
        &index,
        embedder.as_ref(),
        &shoes(),
        &tmp.path().join("emb.bin"),
        IngestOptions::new(IngestMode::Replace),
    )
    .await?;

    let rec = Recommender::new(embedder, Arc::new(index), 5)?;
    assert_eq!(rec.backend_kind(), BackendKind::Remote);
    let out = rec.recommend("running shoe").await?;
    assert_eq!(out.len(), 3);
    assert!(out[..2].iter().all(|r| r.name.ends_with("Shoe")), "{out:?}");
    assert_eq!(out[2].name, "Blue Shirt");
    Ok(())
}

#[tokio::test]
async fn exact_catalog_query_scores_highest() {
    let catalog = big_catalog(12);
    let rec = local_recommender(&catalog, false);
    let query = &catalog.embedding_inputs()[4];
    let out = rec.recommend(query).await.unwrap();
    assert_eq!(out[0].name, "Item 4");
    assert!(out.iter().all(|r| r.score <= out[0].score));
}

#[test]
fn dimension_disagreement_is_a_config_error() {
    let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let index = LocalIndex::from_rows(vec!["a".into(), "b".into()], &rows, IndexOptions::default()).unwrap();
    let err = Recommender::new(embedder(), Arc::new(index), 5).err().expect("must fail");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn zero_limit_is_rejected() {
    let index = RemoteIndex::new(MemoryStore::new(), "products");
    let backend: Arc<dyn SimilarityBackend> = Arc::new(index);
    assert!(matches!(Recommender::new(embedder(), backend, 0), Err(Error::InvalidConfig(_))));
}

fn local_settings(dir: &tempfile::TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.model.use_fake = true;
    settings.data.embeddings = dir.path().join("emb.bin").display().to_string();
    settings.data.products = dir.path().join("prod.json").display().to_string();
    settings
}

#[tokio::test]
async fn service_reports_degraded_health_without_snapshot() {
    let tmp = tempfile::tempdir().unwrap();
    let service = RecommenderService::initialize(&local_settings(&tmp)).await;

    let health = service.health();
    assert!(!health.ready);
    assert_eq!(health.backend, BackendKind::Local);
    assert!(health.detail.as_deref().unwrap_or_default().contains("not found"), "{health:?}");
    assert!(matches!(service.recommend("running shoe").await, Err(Error::NotReady(_))));
}

#[tokio::test]
async fn service_becomes_ready_after_local_ingestion() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let settings = local_settings(&tmp);
    let embedder = recom_embed::get_default_embedder(&settings.model)?;
    ingest_local(
        embedder.as_ref(),
        &big_catalog(10),
        &LocalArtifacts::from_settings(&settings.data),
        IngestOptions::new(IngestMode::Replace),
    )?;

    let service = RecommenderService::initialize(&settings).await;
    let health = service.health();
    assert!(health.ready, "{health:?}");
    assert_eq!(serde_json::to_value(&health)?, serde_json::json!({ "ready": true, "backend": "local" }));
    assert_eq!(service.recommend("wool sock").await?.len(), 5);
    Ok(())
}

#[tokio::test]
async fn unreachable_store_degrades_remote_service() {
    let mut settings = Settings::default();
    settings.model.use_fake = true;
    settings.backend = BackendKind::Remote;
    settings.qdrant.url = Some("http://127.0.0.1:9".to_string());
    settings.qdrant.timeout_secs = 2;

    let service = RecommenderService::initialize(&settings).await;
    assert!(!service.is_ready());
    assert_eq!(service.health().backend, BackendKind::Remote);
}
