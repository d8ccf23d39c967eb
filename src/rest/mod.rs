pub mod clear;
pub mod error;
pub mod export;
pub mod ingest;
pub mod logs;
