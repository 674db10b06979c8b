//! Bound values, executable statements, and the builders for table and catalog statements.

mod builder;
pub mod catalog;
pub mod params;
mod statement;
pub use builder::*;
pub use params::*;
pub use statement::RenderedStatement;
