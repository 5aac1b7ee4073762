//! c4rag-core
//!
//! Shared domain types, configuration, errors, and the first two pipeline
//! stages: corpus loading and chunking.

pub mod chunker;
pub mod config;
pub mod corpus;
pub mod error;
pub mod preprocess;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
