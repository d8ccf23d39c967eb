pub(crate) mod blocking_queries;
pub(crate) mod migrations;
pub mod queries;
pub mod schema;
