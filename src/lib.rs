pub mod catalog;
pub mod config;
pub mod features;
pub mod index;
pub mod recommend;
pub mod resolver;

pub use catalog::{Catalog, Song};
pub use recommend::{RecommendError, RecommendationList, Recommender};

/// Application name for XDG paths
pub const APP_NAME: &str = "soundalike";
