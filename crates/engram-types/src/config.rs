//! Tunable knobs for the memory store.

use serde::{Deserialize, Serialize};

use crate::MemoryError;

/// Configuration for the memory store.
///
/// All fields have serde defaults so a partial TOML/JSON fragment
/// deserializes into a fully usable config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Maximum records per collection (each private collection and the
    /// public collection are bounded independently).  Inserting beyond
    /// this evicts the oldest record, FIFO.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Multiplier applied to every record's weight on each decay pass.
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f32,

    /// Removal floor: a record whose weight drops below this during a
    /// decay pass is removed in that same pass.
    #[serde(default = "default_min_weight")]
    pub min_weight: f32,

    /// Retrieval keeps only hits whose score is strictly greater than
    /// this threshold.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    /// Default weight increment applied by a boost on access.
    #[serde(default = "default_boost_increment")]
    pub boost_increment: f32,

    /// Default similarity threshold for merging near-duplicates.
    #[serde(default = "default_merge_threshold")]
    pub merge_threshold: f32,

    /// Delimiter joining the contents of merged records.
    #[serde(default = "default_merge_delimiter")]
    pub merge_delimiter: String,
}

fn default_capacity() -> usize {
    100
}
fn default_decay_factor() -> f32 {
    0.95
}
fn default_min_weight() -> f32 {
    0.1
}
fn default_relevance_threshold() -> f32 {
    0.1
}
fn default_boost_increment() -> f32 {
    0.1
}
fn default_merge_threshold() -> f32 {
    0.8
}
fn default_merge_delimiter() -> String {
    "；".to_string()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            decay_factor: default_decay_factor(),
            min_weight: default_min_weight(),
            relevance_threshold: default_relevance_threshold(),
            boost_increment: default_boost_increment(),
            merge_threshold: default_merge_threshold(),
            merge_delimiter: default_merge_delimiter(),
        }
    }
}

impl MemoryConfig {
    /// Reject configurations that would break the store's invariants.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.capacity == 0 {
            return Err(MemoryError::InvalidConfig("capacity must be at least 1".to_string()));
        }
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return Err(MemoryError::InvalidConfig(format!(
                "decay_factor must be in (0, 1], got {}",
                self.decay_factor
            )));
        }
        if !(self.min_weight > 0.0 && self.min_weight <= 1.0) {
            return Err(MemoryError::InvalidConfig(format!(
                "min_weight must be in (0, 1], got {}",
                self.min_weight
            )));
        }
        if self.relevance_threshold.is_nan() || !(0.0..=1.0).contains(&self.relevance_threshold) {
            return Err(MemoryError::InvalidConfig(format!(
                "relevance_threshold must be in [0, 1], got {}",
                self.relevance_threshold
            )));
        }
        if !self.boost_increment.is_finite() || self.boost_increment < 0.0 {
            return Err(MemoryError::InvalidConfig(format!(
                "boost_increment must be finite and non-negative, got {}",
                self.boost_increment
            )));
        }
        if self.merge_threshold.is_nan() || !(0.0..=1.0).contains(&self.merge_threshold) {
            return Err(MemoryError::InvalidConfig(format!(
                "merge_threshold must be in [0, 1], got {}",
                self.merge_threshold
            )));
        }
        Ok(())
    }
}
