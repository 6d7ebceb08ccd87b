//! `engram-store` – per-agent semantic memory for conversational agents.
//!
//! Keeps short text observations in memory, retrieves the ones most
//! relevant to a query, and attenuates stale ones over time.
//!
//! # Modules
//!
//! - [`vector`] – bag-of-words tokenization, frequency vectorization, and
//!   cosine similarity over sparse token vectors.
//! - [`store`] – [`MemoryStore`][store::MemoryStore]: capacity-bounded
//!   per-agent collections plus one shared public collection, with
//!   weighted retrieval, decay, weight boosting, and near-duplicate
//!   merging.
//!
//! The conversation handler around the store is expected to call
//! `insert` after each exchange, `retrieve` while composing a reply, and
//! `decay`/`merge_similar` on its own maintenance schedule.  The store
//! keeps no clock and performs no I/O.

pub mod store;
pub mod vector;

pub use store::MemoryStore;
pub use engram_types::{
    MemoryConfig, MemoryError, MemoryOwner, MemoryRecord, MemorySnapshot, MemorySource,
    RetrievedMemory, TokenVector,
};
