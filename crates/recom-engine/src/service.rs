use serde::Serialize;
use tracing::{error, info};

use recom_core::config::Settings;
use recom_core::types::{BackendKind, SearchResult};
use recom_core::{Error, Result};

use crate::recommender::Recommender;

/// Readiness as reported to the serving layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub ready: bool,
    pub backend: BackendKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A [`Recommender`] that may have failed to start.
///
/// Initialization errors are kept and reported through [`health`](Self::health)
/// instead of aborting the process.
pub struct RecommenderService {
    backend: BackendKind,
    state: std::result::Result<Recommender, Error>,
}

impl RecommenderService {
    pub async fn initialize(settings: &Settings) -> Self {
        let state = Recommender::from_settings(settings).await;
        match &state {
            Ok(_) => info!(backend = %settings.backend, "service ready"),
            Err(e) => error!(backend = %settings.backend, error = %e, "service degraded"),
        }
        Self { backend: settings.backend, state }
    }

    pub fn from_recommender(recommender: Recommender) -> Self {
        Self { backend: recommender.backend_kind(), state: Ok(recommender) }
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ok()
    }

    pub fn health(&self) -> Health {
        Health {
            ready: self.is_ready(),
            backend: self.backend,
            detail: self.state.as_ref().err().map(ToString::to_string),
        }
    }

    pub async fn recommend(&self, query: &str) -> Result<Vec<SearchResult>> {
        match &self.state {
            Ok(recommender) => recommender.recommend(query).await,
            Err(e) => Err(Error::NotReady(e.to_string())),
        }
    }
}
