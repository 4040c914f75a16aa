//! In-process Local Tier
//!
//! A bounded map of encoded payloads, each with its own deadline. When the
//! tier is full the entry closest to expiry makes room; a periodic sweep
//! drops everything past its deadline. Deadlines follow the tokio clock.
//!
//! Every removal bumps a generation counter. A mirror write carries the
//! generation observed before its Remote Tier call and is dropped if a
//! removal happened since, so an in-flight read cannot resurrect a key that
//! was deleted while it waited on the network.

use super::pattern::KeyPattern;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct LocalEntry {
    data: Bytes,
    deadline: Instant,
}

/// What happened to a mirror request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Stored,
    /// Stored after evicting the entry nearest to expiry
    StoredWithEviction,
    /// Payload larger than the per-entry limit, or zero lifetime
    Rejected,
    /// A removal ran after the caller observed its generation
    Superseded,
}

#[derive(Debug, Default)]
struct TierState {
    entries: HashMap<String, LocalEntry>,
    generation: u64,
}

impl TierState {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Local Tier
#[derive(Debug)]
pub struct LocalTier {
    state: Mutex<TierState>,
    max_entries: usize,
    max_value_bytes: usize,
}

impl LocalTier {
    pub fn new(max_entries: usize, max_value_bytes: usize) -> Self {
        Self {
            state: Mutex::new(TierState {
                entries: HashMap::with_capacity(max_entries.min(4096)),
                generation: 0,
            }),
            max_entries,
            max_value_bytes,
        }
    }

    /// Current removal generation, to pass to [`insert_if_unchanged`](Self::insert_if_unchanged)
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Mirror a payload for at most `ttl`
    pub fn insert(&self, key: &str, data: Bytes, ttl: Duration) -> Admission {
        let mut state = self.state.lock();
        let generation = state.generation;
        self.admit(&mut state, key, data, ttl, generation)
    }

    /// Mirror a payload unless something was removed after `generation` was read
    pub fn insert_if_unchanged(
        &self,
        key: &str,
        data: Bytes,
        ttl: Duration,
        generation: u64,
    ) -> Admission {
        let mut state = self.state.lock();
        self.admit(&mut state, key, data, ttl, generation)
    }

    fn admit(
        &self,
        state: &mut TierState,
        key: &str,
        data: Bytes,
        ttl: Duration,
        generation: u64,
    ) -> Admission {
        if ttl.is_zero() || data.len() > self.max_value_bytes || self.max_entries == 0 {
            return Admission::Rejected;
        }
        if state.generation != generation {
            return Admission::Superseded;
        }

        let deadline = Instant::now() + ttl;
        let entries = &mut state.entries;

        let mut admission = Admission::Stored;
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            let victim = entries
                .iter()
                .min_by_key(|(_, entry)| entry.deadline)
                .map(|(victim, _)| victim.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
                admission = Admission::StoredWithEviction;
            }
        }

        entries.insert(key.to_string(), LocalEntry { data, deadline });
        admission
    }

    /// Read a live entry; an expired one is dropped on the way
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let mut state = self.state.lock();
        match state.entries.get(key) {
            Some(entry) if entry.deadline > now => Some(entry.data.clone()),
            Some(_) => {
                state.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Remaining lifetime of a live entry
    pub fn remaining(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.state
            .lock()
            .entries
            .get(key)
            .filter(|entry| entry.deadline > now)
            .map(|entry| entry.deadline - now)
    }

    /// Drop `key`; in-flight mirrors of any key started before this are discarded
    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        state.bump();
        state.entries.remove(key).is_some()
    }

    /// Drop every entry whose key matches `pattern`
    pub fn purge_matching(&self, pattern: &KeyPattern) -> usize {
        let mut state = self.state.lock();
        state.bump();
        let before = state.entries.len();
        state.entries.retain(|key, _| !pattern.is_match(key));
        before - state.entries.len()
    }

    /// Drop every entry past its deadline
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.deadline > now);
        before - state.entries.len()
    }

    /// Keys of live entries with their remaining lifetime
    pub fn snapshot(&self) -> Vec<(String, Duration)> {
        let now = Instant::now();
        self.state
            .lock()
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline > now)
            .map(|(key, entry)| (key.clone(), entry.deadline - now))
            .collect()
    }

    /// Number of entries, including ones not yet swept
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
