pub mod client_info;
pub mod filesystem;
pub mod geo;
pub mod ip;
pub mod manifest;
pub mod user_agent;

/// Canonical stand-in for absent data, no field in the model is nullable.
pub const UNKNOWN: &str = "Unknown";
