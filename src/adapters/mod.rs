// Adapters layer: concrete implementations for external systems (NewsAPI, local filesystem).

pub mod http;
pub mod storage;
