//! c4rag-vector
//!
//! Dense retrieval storage: the in-memory [`VectorIndex`] (brute force or
//! IVF) and the LanceDB-backed [`PassageStore`] it is rebuilt from.

pub mod index;
pub mod ivf;
pub mod metric;
pub mod schema;
pub mod store;
pub mod table;

pub use index::{IndexEntry, PassageMeta, VectorIndex};
pub use store::{PassageStore, StoreManifest, StoredPassages};
