//! HTTP handlers for table routes, the upsert pipeline, and fixed system endpoints.

pub mod system;
pub mod table;
pub mod upsert;
pub use upsert::upsert;
