pub mod cache;
pub mod config;
pub mod highlight;
pub mod service;

pub use cache::SuggestionCache;
pub use config::{CacheConfig, CodecConfig, SuggesterConfig};
pub use highlight::highlight;
pub use service::{LookupRequest, LookupResponse, Suggester, Suggestion};
