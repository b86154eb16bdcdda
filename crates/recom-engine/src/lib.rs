pub mod recommender;
pub mod service;

pub use recommender::Recommender;
pub use service::{Health, RecommenderService};
