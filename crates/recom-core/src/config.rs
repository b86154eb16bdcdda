//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_QDRANT__URL`). Connection strings
//! get `${VAR}`/`$VAR` expansion; paths additionally expand a leading `~`.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::BackendKind;

pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, env_name })
    }

    /// Wrap an already assembled provider stack.
    pub fn from_figment(figment: Figment, env_name: &str) -> Self {
        Self { figment, env_name: env_name.to_string() }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("failed to get '{key}': {e}")))
    }

    /// Extract, expand and validate the typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.qdrant.url = settings.qdrant.url.as_deref().map(expand_vars);
        settings.qdrant.api_key = settings.qdrant.api_key.as_deref().map(expand_vars);
        settings.validate()?;
        self.validate_for_env(&settings)?;
        Ok(settings)
    }

    fn validate_for_env(&self, settings: &Settings) -> Result<()> {
        match self.env_name.as_str() {
            "prod" | "production" if settings.model.use_fake => Err(Error::InvalidConfig(
                "model.use_fake must be disabled in production".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub backend: BackendKind,
    pub data: DataSettings,
    pub qdrant: QdrantSettings,
    pub ranking: RankingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub name: String,
    /// Directory with `tokenizer.json`, `config.json` and the weights.
    pub dir: Option<String>,
    pub max_len: usize,
    pub use_fake: bool,
    /// `auto` picks the first available accelerator; `cpu` forces the CPU.
    pub device: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            dir: None,
            max_len: 256,
            use_fake: false,
            device: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub catalog: String,
    pub embeddings: String,
    pub products: String,
    /// Vector cache for remote ingestion, kept apart from the local snapshot.
    pub remote_embeddings: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            catalog: "data/products.csv".to_string(),
            embeddings: "data/emb.bin".to_string(),
            products: "data/prod.json".to_string(),
            remote_embeddings: "data/remote_emb.bin".to_string(),
        }
    }
}

impl DataSettings {
    pub fn catalog_path(&self) -> PathBuf {
        expand_path(&self.catalog)
    }

    pub fn embeddings_path(&self) -> PathBuf {
        expand_path(&self.embeddings)
    }

    pub fn products_path(&self) -> PathBuf {
        expand_path(&self.products)
    }

    pub fn remote_embeddings_path(&self) -> PathBuf {
        expand_path(&self.remote_embeddings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantSettings {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub collection_name: String,
    pub timeout_secs: u64,
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self { url: None, api_key: None, collection_name: "products".to_string(), timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    pub limit: usize,
    /// Drop the best local match, which is assumed to be the query itself.
    pub skip_top_match: bool,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self { limit: 5, skip_top_match: true }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.model.name.trim().is_empty() {
            return Err(Error::InvalidConfig("model.name is required".to_string()));
        }
        if self.ranking.limit == 0 {
            return Err(Error::InvalidConfig("ranking.limit must be at least 1".to_string()));
        }
        if self.data.remote_embeddings_path() == self.data.embeddings_path() {
            return Err(Error::InvalidConfig(
                "data.remote_embeddings must differ from data.embeddings".to_string(),
            ));
        }
        let url_resolved = self.qdrant.url.as_deref().is_some_and(is_resolved);
        if self.backend == BackendKind::Remote && !url_resolved {
            return Err(Error::InvalidConfig(
                "qdrant.url is not set or not resolved; check your environment".to_string(),
            ));
        }
        if self.backend == BackendKind::Remote && !self.qdrant.api_key.as_deref().is_some_and(is_resolved) {
            warn!("qdrant.api_key is not set or not resolved; connecting without credentials");
        }
        Ok(())
    }
}

fn is_resolved(value: &str) -> bool {
    !value.trim().is_empty() && !value.starts_with('$')
}

/// Expand `${VAR}` and `$VAR`, leaving unknown variables verbatim.
pub fn expand_vars(input: &str) -> String {
    shellexpand::env_with_context_no_errors(input, |var| env::var(var).ok()).into_owned()
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
