use std::fs;

use figment::providers::{Format, Toml};
use figment::Figment;
use serde_json::Value;
use tempfile::TempDir;

use recom_core::catalog::Catalog;
use recom_core::config::{Config, DEFAULT_MODEL};
use recom_core::error::Error;
use recom_core::types::BackendKind;

const CATALOG: &str = "\
product_id,product_name,description,price
1,Red Shoe,running shoe,49.99
2,Blue Shoe,running shoe,
3,Blue Shirt,cotton shirt,19.00
";

#[test]
fn catalog_loads_rows_in_order_with_payload() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("products.csv");
    fs::write(&path, CATALOG).unwrap();

    let catalog = Catalog::load(&path).expect("load");
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.names(), ["Red Shoe", "Blue Shoe", "Blue Shirt"]);
    assert_eq!(catalog.embedding_inputs()[0], "Red Shoe running shoe");

    let second = &catalog.products()[1];
    assert_eq!(second.id, "2");
    assert_eq!(second.payload["price"], Value::Null, "empty cells become null");
    assert_eq!(second.payload["product_name"], Value::String("Blue Shoe".into()));
}

#[test]
fn catalog_missing_description_cell_is_empty_text() {
    let catalog = Catalog::from_reader("product_id,product_name,description\n7,Mug,\n".as_bytes()).unwrap();
    assert_eq!(catalog.products()[0].description, "");
    assert_eq!(catalog.embedding_inputs()[0], "Mug ");
}

#[test]
fn catalog_rejects_missing_required_columns() {
    let err = Catalog::from_reader("product_id,title\n1,Hat\n".as_bytes()).unwrap_err();
    match err {
        Error::Catalog(msg) => {
            assert!(msg.contains("product_name"), "{msg}");
            assert!(msg.contains("description"), "{msg}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn catalog_missing_file_is_reported() {
    let err = Catalog::load(std::path::Path::new("/definitely/not/here.csv")).unwrap_err();
    assert!(matches!(err, Error::Catalog(_)));
}

fn config_from(toml: &str, env: &str) -> Config {
    Config::from_figment(Figment::new().merge(Toml::string(toml)), env)
}

#[test]
fn defaults_apply_when_keys_are_absent() {
    let settings = config_from("", "dev").settings().expect("settings");
    assert_eq!(settings.model.name, DEFAULT_MODEL);
    assert_eq!(settings.backend, BackendKind::Local);
    assert_eq!(settings.ranking.limit, 5);
    assert!(settings.ranking.skip_top_match);
    assert_eq!(settings.qdrant.collection_name, "products");
    assert_eq!(settings.model.device, "auto");
}

#[test]
fn remote_backend_requires_resolved_url() {
    let err = config_from("backend = \"remote\"\n", "dev").settings().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    let err = config_from(
        "backend = \"remote\"\n[qdrant]\nurl = \"${RECOM_TEST_SURELY_UNSET_VAR}\"\n",
        "dev",
    )
    .settings()
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)), "unresolved variable stays verbatim");
}

#[test]
fn connection_strings_expand_environment_variables() {
    std::env::set_var("RECOM_TEST_QDRANT_HOST", "qdrant.internal");
    let settings = config_from(
        "backend = \"remote\"\n[qdrant]\nurl = \"http://${RECOM_TEST_QDRANT_HOST}:6333\"\n",
        "dev",
    )
    .settings()
    .expect("settings");
    assert_eq!(settings.qdrant.url.as_deref(), Some("http://qdrant.internal:6333"));
}

#[test]
fn remote_cache_is_kept_apart_from_local_snapshot() {
    let settings = config_from("", "dev").settings().expect("settings");
    assert_ne!(settings.data.remote_embeddings_path(), settings.data.embeddings_path());

    let err = config_from("[data]\nembeddings = \"emb.bin\"\nremote_embeddings = \"emb.bin\"\n", "dev")
        .settings()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn zero_limit_is_rejected() {
    let err = config_from("[ranking]\nlimit = 0\n", "dev").settings().unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn production_refuses_fake_embeddings() {
    let toml = "[model]\nuse_fake = true\n";
    assert!(config_from(toml, "dev").settings().is_ok());
    assert!(matches!(config_from(toml, "prod").settings(), Err(Error::InvalidConfig(_))));
}

#[test]
fn get_reads_nested_keys() {
    let config = config_from("[qdrant]\ncollection_name = \"catalog_v2\"\n", "dev");
    let name: String = config.get("qdrant.collection_name").unwrap();
    assert_eq!(name, "catalog_v2");
}
