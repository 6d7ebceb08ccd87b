//! Capacity-bounded, weight-decaying memory store.
//!
//! Owns every [`MemoryRecord`]: one insertion-ordered private collection
//! per agent (created lazily) plus one shared public collection.  Offers
//! insert, similarity-ranked retrieval, explicit weight boosting, decay,
//! near-duplicate merging, and content update, snapshot, and removal for
//! the UI listing.
//!
//! # Locking
//!
//! Every collection sits behind its own mutex, so operations on
//! different agents (and on the public collection) proceed in parallel
//! while a single collection only ever sees one writer.  No operation
//! performs I/O, so hold times are bounded by in-memory work over at
//! most `capacity` records.  No method locks two collections at once,
//! which rules out deadlock by construction.
//!
//! # Example
//!
//! ```rust
//! use engram_store::MemoryStore;
//!
//! let store = MemoryStore::default();
//! store.insert("alice", "I like apples", false);
//! store.insert("alice", "apples are a fruit", true);
//!
//! let hits = store.retrieve("alice", "apples", 5);
//! assert_eq!(hits.len(), 2);
//! assert!(hits[0].score >= hits[1].score);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, info, trace};
use uuid::Uuid;

use engram_types::{
    MemoryConfig, MemoryError, MemoryOwner, MemoryRecord, MemorySnapshot, MemorySource,
    RetrievedMemory,
};

use crate::vector::{cosine_similarity, vectorize};

/// One insertion-ordered collection.  `VecDeque` keeps FIFO eviction at
/// O(1) instead of shifting a growable array.
type Collection = VecDeque<MemoryRecord>;

/// Recover the guard from a poisoned mutex.  Every operation leaves the
/// collection structurally valid at each step, so the records behind a
/// poisoned lock are still usable.
fn lock(collection: &Mutex<Collection>) -> MutexGuard<'_, Collection> {
    collection.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory semantic memory store, partitioned per agent with one
/// shared public collection.
///
/// All methods take `&self`; the store is `Send + Sync` and can be
/// shared across threads behind an `Arc`.  State lives only in this
/// process – dropping the store (or exiting) destroys every record.
pub struct MemoryStore {
    config: MemoryConfig,
    /// Agent id → that agent's private collection.
    agents: RwLock<HashMap<String, Arc<Mutex<Collection>>>>,
    /// The shared public collection.
    public: Mutex<Collection>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryConfig::default()).expect("default config validates")
    }
}

impl MemoryStore {
    /// Create a store with the given configuration.
    ///
    /// Fails with [`MemoryError::InvalidConfig`] if the config is
    /// unusable.
    pub fn new(config: MemoryConfig) -> Result<Self, MemoryError> {
        config.validate()?;
        Ok(Self {
            config,
            agents: RwLock::new(HashMap::new()),
            public: Mutex::new(Collection::new()),
        })
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Fetch the collection for `agent`, creating it on first use.
    fn agent_collection(&self, agent: &str) -> Arc<Mutex<Collection>> {
        let agents = self.agents.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(collection) = agents.get(agent) {
            return collection.clone();
        }
        drop(agents);
        let mut agents = self.agents.write().unwrap_or_else(PoisonError::into_inner);
        agents.entry(agent.to_string()).or_default().clone()
    }

    /// Fetch the collection for `agent` if it already exists.
    fn existing_agent_collection(&self, agent: &str) -> Option<Arc<Mutex<Collection>>> {
        let agents = self.agents.read().unwrap_or_else(PoisonError::into_inner);
        agents.get(agent).cloned()
    }

    /// Snapshot the handles of every private collection.
    fn all_agent_collections(&self) -> Vec<Arc<Mutex<Collection>>> {
        let agents = self.agents.read().unwrap_or_else(PoisonError::into_inner);
        agents.values().cloned().collect()
    }

    // ── insert ───────────────────────────────────────────────────────────────

    /// Store a new observation and return the created record.
    ///
    /// When `is_public` is true the record lands in the shared public
    /// collection and `agent` is ignored.  Empty `content` is accepted
    /// and simply vectorizes to an empty vector (such a record can never
    /// score above the relevance threshold).
    ///
    /// If the target collection exceeds its capacity after the append,
    /// the single oldest record in that collection is evicted – FIFO,
    /// not lowest-weight.
    pub fn insert(&self, agent: &str, content: &str, is_public: bool) -> MemoryRecord {
        let owner = if is_public {
            MemoryOwner::Public
        } else {
            MemoryOwner::Agent(agent.to_string())
        };
        let record = MemoryRecord::new(owner, content, vectorize(content));

        let evicted = if is_public {
            let mut public = lock(&self.public);
            public.push_back(record.clone());
            if public.len() > self.config.capacity { public.pop_front() } else { None }
        } else {
            let collection = self.agent_collection(agent);
            let mut collection = lock(&collection);
            collection.push_back(record.clone());
            if collection.len() > self.config.capacity { collection.pop_front() } else { None }
        };

        debug!(id = %record.id, public = is_public, "memory inserted");
        if let Some(old) = evicted {
            debug!(id = %old.id, "capacity reached, oldest memory evicted");
        }
        record
    }

    // ── retrieve ─────────────────────────────────────────────────────────────

    /// Return up to `limit` records relevant to `query`, scored by
    /// `cosine_similarity × weight`, best first.
    ///
    /// Scans the agent's private collection (if any) and then the public
    /// collection; only hits scoring strictly above the configured
    /// relevance threshold survive.  The sort is stable, so equal scores
    /// keep scan order – a persona record outranks a public record with
    /// the same score.  That tie-break is deliberate and pinned by test.
    ///
    /// Retrieval is a pure peek: no weights or access counts change.
    /// Callers wanting the access side effect follow up with
    /// [`boost_weight`](Self::boost_weight).
    pub fn retrieve(&self, agent: &str, query: &str, limit: usize) -> Vec<RetrievedMemory> {
        let query_vector = vectorize(query);
        let mut results = Vec::new();

        if let Some(collection) = self.existing_agent_collection(agent) {
            let collection = lock(&collection);
            for record in collection.iter() {
                let score = cosine_similarity(&query_vector, &record.vector) * record.weight;
                if score > self.config.relevance_threshold {
                    results.push(RetrievedMemory {
                        record: record.clone(),
                        score,
                        source: MemorySource::Persona,
                    });
                }
            }
        }

        {
            let public = lock(&self.public);
            for record in public.iter() {
                let score = cosine_similarity(&query_vector, &record.vector) * record.weight;
                if score > self.config.relevance_threshold {
                    results.push(RetrievedMemory {
                        record: record.clone(),
                        score,
                        source: MemorySource::Public,
                    });
                }
            }
        }

        // Stable by contract: ties decided by scan order, persona first.
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(limit);
        trace!(agent, hits = results.len(), "retrieval complete");
        results
    }

    // ── decay ────────────────────────────────────────────────────────────────

    /// One maintenance pass: multiply every record's weight (private and
    /// public alike) by the configured decay factor, removing any record
    /// whose weight lands below the floor.  Returns the number of
    /// records removed.
    ///
    /// Scheduling is the caller's job; the store keeps no clock.
    pub fn decay(&self) -> usize {
        let factor = self.config.decay_factor;
        let floor = self.config.min_weight;
        let mut removed = 0;

        for collection in self.all_agent_collections() {
            removed += Self::decay_collection(&mut lock(&collection), factor, floor);
        }
        removed += Self::decay_collection(&mut lock(&self.public), factor, floor);

        info!(removed, "decay pass complete");
        removed
    }

    /// Weights decay independently of each other, so one in-place sweep
    /// is equivalent to "compute all weights, then filter".
    fn decay_collection(collection: &mut Collection, factor: f32, floor: f32) -> usize {
        let before = collection.len();
        for record in collection.iter_mut() {
            record.weight *= factor;
        }
        collection.retain(|record| record.weight >= floor);
        before - collection.len()
    }

    // ── boost_weight ─────────────────────────────────────────────────────────

    /// Nudge a record's weight up after it has been used, capping at 1.0
    /// and bumping its access count.
    ///
    /// Looks in `agent`'s private collection first, then in the public
    /// collection.  A miss is tolerated silently and reported as
    /// `Ok(false)`.  A negative or non-finite `increment` is a
    /// programming error and fails fast.
    pub fn boost_weight(&self, id: Uuid, agent: &str, increment: f32) -> Result<bool, MemoryError> {
        if !increment.is_finite() || increment < 0.0 {
            return Err(MemoryError::InvalidIncrement(increment));
        }

        if let Some(collection) = self.existing_agent_collection(agent) {
            let mut collection = lock(&collection);
            if let Some(record) = collection.iter_mut().find(|r| r.id == id) {
                record.weight = (record.weight + increment).min(1.0);
                record.access_count += 1;
                return Ok(true);
            }
        }

        let mut public = lock(&self.public);
        if let Some(record) = public.iter_mut().find(|r| r.id == id) {
            record.weight = (record.weight + increment).min(1.0);
            record.access_count += 1;
            return Ok(true);
        }

        debug!(%id, agent, "weight boost for unknown record ignored");
        Ok(false)
    }

    // ── merge_similar ────────────────────────────────────────────────────────

    /// Collapse near-duplicates within one agent's private collection.
    /// The public collection is never merged.
    ///
    /// Greedy single pass in collection order: each not-yet-merged
    /// record absorbs every later record whose similarity to it is at
    /// least `threshold`.  The representative keeps the first record's
    /// id, owner, creation time and access count; its content becomes
    /// the group's contents joined with the configured delimiter in
    /// encounter order, its vector is rebuilt fresh from that joined
    /// content, and its weight is the group's maximum.
    ///
    /// Returns the number of absorbed records.  No-op (`Ok(0)`) when the
    /// agent has no collection.  Not idempotent in general – a merged
    /// vector can newly cross the threshold with another record, so
    /// running several passes is a legitimate pattern.
    pub fn merge_similar(&self, agent: &str, threshold: f32) -> Result<usize, MemoryError> {
        if threshold.is_nan() || !(0.0..=1.0).contains(&threshold) {
            return Err(MemoryError::InvalidThreshold(threshold));
        }
        let Some(collection) = self.existing_agent_collection(agent) else {
            return Ok(0);
        };
        let mut collection = lock(&collection);

        let records: Vec<MemoryRecord> = collection.drain(..).collect();
        let mut merged: Collection = VecDeque::with_capacity(records.len());
        let mut used = vec![false; records.len()];
        let mut absorbed = 0;

        for i in 0..records.len() {
            if used[i] {
                continue;
            }
            used[i] = true;

            let mut group = vec![i];
            for j in (i + 1)..records.len() {
                if used[j] {
                    continue;
                }
                if cosine_similarity(&records[i].vector, &records[j].vector) >= threshold {
                    used[j] = true;
                    group.push(j);
                }
            }

            if group.len() > 1 {
                let content = group
                    .iter()
                    .map(|&k| records[k].content.as_str())
                    .collect::<Vec<_>>()
                    .join(&self.config.merge_delimiter);
                let weight = group.iter().map(|&k| records[k].weight).fold(0.0, f32::max);

                let mut representative = records[i].clone();
                representative.content = content;
                // Fresh vector, never a mutation of an existing one.
                representative.vector = vectorize(&representative.content);
                representative.weight = weight;

                absorbed += group.len() - 1;
                merged.push_back(representative);
            } else {
                merged.push_back(records[i].clone());
            }
        }

        *collection = merged;
        if absorbed > 0 {
            info!(agent, absorbed, "similar memories merged");
        }
        Ok(absorbed)
    }

    // ── update, snapshots & removal ──────────────────────────────────────────

    /// Everything an agent can see: its own records plus the full public
    /// collection, cloned.  Serves the UI listing and export.
    pub fn get_all(&self, agent: &str) -> MemorySnapshot {
        let persona = self
            .existing_agent_collection(agent)
            .map(|collection| lock(&collection).iter().cloned().collect())
            .unwrap_or_default();
        let public = lock(&self.public).iter().cloned().collect();
        MemorySnapshot { persona, public }
    }

    /// Replace a record's content, rebuilding its vector from the new
    /// text, wherever the record lives.  Returns `true` if a record was
    /// found.
    ///
    /// Weight, id, creation time and access count are untouched – this
    /// is a content edit, not a new observation.  Together with merge,
    /// it is the only sanctioned content mutation, which is what keeps
    /// the vector-never-stale invariant intact.
    pub fn update(&self, id: Uuid, content: &str) -> bool {
        for collection in self.all_agent_collections() {
            let mut collection = lock(&collection);
            if let Some(record) = collection.iter_mut().find(|r| r.id == id) {
                record.content = content.to_string();
                record.vector = vectorize(&record.content);
                return true;
            }
        }
        let mut public = lock(&self.public);
        if let Some(record) = public.iter_mut().find(|r| r.id == id) {
            record.content = content.to_string();
            record.vector = vectorize(&record.content);
            return true;
        }
        debug!(%id, "content update for unknown record ignored");
        false
    }

    /// Delete a single record by id from whichever collection holds it.
    /// Returns `true` if a record was removed.
    pub fn remove(&self, id: Uuid) -> bool {
        for collection in self.all_agent_collections() {
            let mut collection = lock(&collection);
            let before = collection.len();
            collection.retain(|record| record.id != id);
            if collection.len() < before {
                return true;
            }
        }
        let mut public = lock(&self.public);
        let before = public.len();
        public.retain(|record| record.id != id);
        public.len() < before
    }

    /// Number of records in `agent`'s private collection (0 if the
    /// collection has never been created).
    pub fn agent_len(&self, agent: &str) -> usize {
        self.existing_agent_collection(agent)
            .map(|collection| lock(&collection).len())
            .unwrap_or(0)
    }

    /// Number of records in the public collection.
    pub fn public_len(&self) -> usize {
        lock(&self.public).len()
    }

    /// Returns `true` if no collection holds any record.
    pub fn is_empty(&self) -> bool {
        self.public_len() == 0
            && self
                .all_agent_collections()
                .iter()
                .all(|collection| lock(collection).is_empty())
    }
}
