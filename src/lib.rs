pub mod acquire;
pub mod align;
pub mod app;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod rcsb;
pub mod record;
pub mod store;
pub mod structure;
pub mod toolkit;
