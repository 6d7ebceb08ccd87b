//! `engram-types` – shared data model for the Engram memory store.
//!
//! Defines the record shape held by every collection
//! ([`MemoryRecord`]), the ownership and retrieval-source tags
//! ([`MemoryOwner`], [`MemorySource`]), the result and export shapes
//! ([`RetrievedMemory`], [`MemorySnapshot`]), the tunable knobs
//! ([`config::MemoryConfig`]) and the error type ([`MemoryError`]).
//!
//! The store itself lives in `engram-store`; this crate is pure data so
//! collaborators (chat handler, UI listing, export) can depend on the
//! shapes without pulling in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

pub mod config;

pub use config::MemoryConfig;

/// Sparse bag-of-words vector: token → occurrence count.
///
/// Tokens that do not occur are absent, never stored as explicit zeros.
pub type TokenVector = HashMap<String, u32>;

/// Who a memory record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemoryOwner {
    /// Private to a single agent, identified by its id.
    Agent(String),
    /// Shared memory, visible to retrieval regardless of requesting agent.
    Public,
}

impl MemoryOwner {
    pub fn is_public(&self) -> bool {
        matches!(self, MemoryOwner::Public)
    }
}

/// Which collection a retrieval hit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySource {
    /// The requesting agent's own private collection.
    Persona,
    /// The shared public collection.
    Public,
}

impl std::fmt::Display for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemorySource::Persona => write!(f, "persona"),
            MemorySource::Public => write!(f, "public"),
        }
    }
}

/// A single stored memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique identifier, generated at creation.  UUIDv4, so uniqueness
    /// holds even for inserts landing in the same millisecond.
    pub id: Uuid,
    /// Owning agent, or [`MemoryOwner::Public`].
    pub owner: MemoryOwner,
    /// Original text.  Immutable except through an explicit merge.
    pub content: String,
    /// Token-frequency vector of `content`.  Always the exact
    /// vectorization of the current content, recomputed on merge.
    pub vector: TokenVector,
    /// Relevance multiplier in `(0.0, 1.0]`.  Starts at 1.0, shrinks
    /// under decay, may be nudged back up (capped at 1.0) on access.
    pub weight: f32,
    /// Wall-clock time at which the record was created.
    pub created_at: DateTime<Utc>,
    /// Number of weight-boosting accesses so far.
    pub access_count: u64,
}

impl MemoryRecord {
    /// Construct a fresh record with a new id, full weight, and the
    /// current UTC timestamp.  `vector` must be the vectorization of
    /// `content`; the store is the only expected caller.
    pub fn new(owner: MemoryOwner, content: impl Into<String>, vector: TokenVector) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            content: content.into(),
            vector,
            weight: 1.0,
            created_at: Utc::now(),
            access_count: 0,
        }
    }
}

/// A retrieval hit: the record plus its computed score and source tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedMemory {
    pub record: MemoryRecord,
    /// `cosine_similarity(query, record.vector) * record.weight`.
    pub score: f32,
    pub source: MemorySource,
}

/// Full view of one agent's memory plus the shared public collection,
/// as served to the UI listing and data export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub persona: Vec<MemoryRecord>,
    pub public: Vec<MemoryRecord>,
}

/// Errors surfaced by the memory store.
///
/// These are all precondition violations; normal operation degrades
/// gracefully (unknown ids are silent no-ops, empty text vectorizes to
/// an empty vector) and never errors.
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("weight increment must be finite and non-negative, got {0}")]
    InvalidIncrement(f32),

    #[error("similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serialization_roundtrip() {
        let mut vector = TokenVector::new();
        vector.insert("apples".to_string(), 2);
        let record = MemoryRecord::new(MemoryOwner::Agent("alice".to_string()), "apples apples", vector);

        let json = serde_json::to_string(&record).unwrap();
        let back: MemoryRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, record.id);
        assert_eq!(back.owner, record.owner);
        assert_eq!(back.content, "apples apples");
        assert_eq!(back.vector.get("apples"), Some(&2));
        assert!((back.weight - 1.0).abs() < f32::EPSILON);
        assert_eq!(back.access_count, 0);
        assert_eq!(back.created_at, record.created_at);
    }

    #[test]
    fn new_record_starts_at_full_weight() {
        let record = MemoryRecord::new(MemoryOwner::Public, "hello", TokenVector::new());
        assert!((record.weight - 1.0).abs() < f32::EPSILON);
        assert_eq!(record.access_count, 0);
        assert!(record.owner.is_public());
    }

    #[test]
    fn fresh_records_get_distinct_ids() {
        let a = MemoryRecord::new(MemoryOwner::Public, "a", TokenVector::new());
        let b = MemoryRecord::new(MemoryOwner::Public, "a", TokenVector::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn memory_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MemorySource::Persona).unwrap(), "\"persona\"");
        assert_eq!(serde_json::to_string(&MemorySource::Public).unwrap(), "\"public\"");
    }

    #[test]
    fn memory_source_display_matches_tags() {
        assert_eq!(MemorySource::Persona.to_string(), "persona");
        assert_eq!(MemorySource::Public.to_string(), "public");
    }

    #[test]
    fn owner_roundtrip() {
        let owner = MemoryOwner::Agent("bob".to_string());
        let json = serde_json::to_string(&owner).unwrap();
        let back: MemoryOwner = serde_json::from_str(&json).unwrap();
        assert_eq!(owner, back);
        assert!(!back.is_public());
    }
}
