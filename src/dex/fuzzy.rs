//! A dictionary that tolerates noisy keys.
//!
//! Exact lookups behave like a map. Best-match lookups score every stored key
//! with an injected confidence function and return the highest scorer.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// Scores how well a stored key (`actual`) matches the requested key
/// (`desired`). Returns a value in `[0, 1]`, higher is better.
pub type KeyConfidence<K> = Box<dyn Fn(&K, &K) -> f32 + Send + Sync>;

#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("no entry with key {0}")]
    KeyNotFound(String),
    #[error("an entry with key {0} already exists")]
    DuplicateKey(String),
}

/// A value together with how confident the lookup was.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch<V> {
    pub value: V,
    /// 1.0 only for exact key matches.
    pub confidence: f32,
}

pub struct FuzzyCache<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
    confidence: KeyConfidence<K>,
}

impl<K, V> FuzzyCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(confidence: impl Fn(&K, &K) -> f32 + Send + Sync + 'static) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            confidence: Box::new(confidence),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds an entry. Fails if the key is already present.
    pub fn add(&mut self, key: K, value: V) -> Result<(), LookupError> {
        if self.index.contains_key(&key) {
            return Err(LookupError::DuplicateKey(format!("{:?}", key)));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        Ok(())
    }

    /// Gets the value for `key` without any guessing.
    pub fn get_exact(&self, key: &K) -> Result<&V, LookupError> {
        self.index
            .get(key)
            .map(|&i| &self.entries[i].1)
            .ok_or_else(|| LookupError::KeyNotFound(format!("{:?}", key)))
    }

    /// Gets the value whose key scores best against `key`.
    ///
    /// An exact key wins outright with confidence 1.0. Otherwise ties on the
    /// best score go to the entry that was added first. Returns `None` only
    /// when the cache is empty.
    pub fn get_best(&self, key: &K) -> Option<FuzzyMatch<&V>> {
        if let Ok(value) = self.get_exact(key) {
            return Some(FuzzyMatch {
                value,
                confidence: 1.0,
            });
        }

        let mut best: Option<FuzzyMatch<&V>> = None;
        for (candidate, value) in &self.entries {
            let score = (self.confidence)(key, candidate);
            // Strictly greater keeps the earliest entry on ties
            if best.is_none_or(|b| score > b.confidence) {
                best = Some(FuzzyMatch {
                    value,
                    confidence: score,
                });
            }
        }
        best
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}
