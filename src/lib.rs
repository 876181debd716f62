pub mod cache;
pub mod classifier;
pub mod fetcher;
pub mod miniflux;
pub mod service;
pub mod types;

pub use cache::SeenCache;
pub use classifier::PaywallClassifier;
pub use fetcher::PageFetcher;
pub use miniflux::{FeedSource, MinifluxClient};
pub use service::FilterService;
pub use types::*;
