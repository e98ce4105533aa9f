//! REST adapters - HTTP access to the agency API.

mod entity_fetcher;

pub use entity_fetcher::RestEntityFetcher;
