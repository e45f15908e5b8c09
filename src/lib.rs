pub mod client;
pub mod collector;
pub mod config;
pub mod dedup;
pub mod error;
pub mod metrics;
pub mod model;
pub mod repository;
pub mod scheduler;
pub mod scrape;
pub mod sink;
