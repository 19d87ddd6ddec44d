pub mod api;
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod search;
pub mod storage;
