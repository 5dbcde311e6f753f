//! Per-model TTL cache of generation results
//!
//! Lets the UI switch between models' results without re-fetching. Entries
//! expire lazily: an expired lookup evicts, listings filter live.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};

use super::engine::ModelOutcome;
use crate::core::clock::now_ms;
use crate::core::CacheConfig;

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: ModelOutcome,
    stored_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub fresh_entries: usize,
    pub expired_entries: usize,
    pub ttl_ms: u64,
    pub max_results: usize,
    pub models: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LlmResultCache {
    entries: HashMap<String, CacheEntry>,
    ttl_ms: u64,
    max_results: usize,
}

impl Default for LlmResultCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl LlmResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_ms: config.ttl_ms,
            max_results: config.max_results.max(1),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry, now: u64) -> bool {
        now.saturating_sub(entry.stored_at_ms) < self.ttl_ms
    }

    pub fn store(&mut self, model: &str, outcome: ModelOutcome) {
        self.store_at(model, outcome, now_ms());
    }

    /// Store with an explicit timestamp; evicts the oldest entry when full
    pub fn store_at(&mut self, model: &str, outcome: ModelOutcome, now: u64) {
        self.entries.insert(
            model.to_string(),
            CacheEntry {
                outcome,
                stored_at_ms: now,
            },
        );
        while self.entries.len() > self.max_results {
            let oldest = self
                .entries
                .iter()
                .filter(|(name, _)| name.as_str() != model)
                .min_by_key(|(_, entry)| entry.stored_at_ms)
                .map(|(name, _)| name.clone());
            match oldest {
                Some(name) => {
                    debug!(model = %name, "Cache full, evicting oldest result");
                    self.entries.remove(&name);
                }
                None => break,
            }
        }
        trace!(model, entries = self.entries.len(), "Result cached");
    }

    pub fn retrieve(&mut self, model: &str) -> Option<ModelOutcome> {
        self.retrieve_at(model, now_ms())
    }

    /// Look up with an explicit clock; an expired entry is evicted
    pub fn retrieve_at(&mut self, model: &str, now: u64) -> Option<ModelOutcome> {
        let entry = self.entries.get(model)?;
        if self.is_fresh(entry, now) {
            return Some(entry.outcome.clone());
        }
        debug!(model, "Cached result expired");
        self.entries.remove(model);
        None
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns true when an entry was removed
    pub fn clear_model(&mut self, model: &str) -> bool {
        self.entries.remove(model).is_some()
    }

    pub fn has_all_results(&self, models: &[String]) -> bool {
        self.has_all_results_at(models, now_ms())
    }

    pub fn has_all_results_at(&self, models: &[String], now: u64) -> bool {
        models.iter().all(|model| {
            self.entries
                .get(model)
                .map(|entry| self.is_fresh(entry, now))
                .unwrap_or(false)
        })
    }

    pub fn get_cached_models(&self) -> Vec<String> {
        self.get_cached_models_at(now_ms())
    }

    /// Fresh models, sorted
    pub fn get_cached_models_at(&self, now: u64) -> Vec<String> {
        let mut models: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_fresh(entry, now))
            .map(|(model, _)| model.clone())
            .collect();
        models.sort();
        models
    }

    pub fn get_stats(&self) -> CacheStats {
        self.get_stats_at(now_ms())
    }

    pub fn get_stats_at(&self, now: u64) -> CacheStats {
        let models = self.get_cached_models_at(now);
        CacheStats {
            total_entries: self.entries.len(),
            fresh_entries: models.len(),
            expired_entries: self.entries.len() - models.len(),
            ttl_ms: self.ttl_ms,
            max_results: self.max_results,
            models,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
