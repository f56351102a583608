//! Context retrieval for a reflective AI companion
//!
//! Past interactions and stated goals are kept in JSON stores. For each new
//! thought the most relevant entries are retrieved, either by keyword overlap
//! or by vector similarity, and assembled with the persona principles into a
//! prompt for a text generator.

pub mod companion;
pub mod core;
pub mod error;
pub mod generator;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod prompt;
pub mod retrieval;
pub mod search;

pub use companion::{Companion, Recall, Reflection, SourceKind};
pub use error::{IndexError, RetrievalError};
