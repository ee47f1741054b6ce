//! API key rotation.
//!
//! A provider setting may carry several keys in one string. Each adapter owns a
//! [`KeyRoulette`] and asks it for the key to use on every outgoing call. Rotation
//! is tracked per setting instance, identified by the setting's `id`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use crate::error::{ProviderError, ProviderResult};
use crate::utils::split_keys;

/// Picks the key for the next call out of a pool of keys
pub trait KeyRoulette: Send + Sync {
    /// Next key from `raw_keys`, the pool configured on the setting `setting_id`
    fn next(&self, setting_id: Uuid, raw_keys: &str) -> ProviderResult<String>;
}

/// Build the default roulette used by the bundled adapters
pub fn default_roulette() -> Arc<dyn KeyRoulette> {
    Arc::new(RoundRobinKeyRoulette::new())
}

/// Round-robin over the pool, one cursor per provider setting.
///
/// Cursors live in memory only and start from the first key. Editing the keys of
/// a setting keeps its cursor; the index wraps over the new pool size.
#[derive(Debug, Default)]
pub struct RoundRobinKeyRoulette {
    cursors: Mutex<HashMap<Uuid, Arc<AtomicUsize>>>,
}

impl RoundRobinKeyRoulette {
    pub fn new() -> Self {
        Self::default()
    }

    fn cursor(&self, setting_id: Uuid) -> Arc<AtomicUsize> {
        let mut cursors = self.cursors.lock().unwrap_or_else(PoisonError::into_inner);
        cursors
            .entry(setting_id)
            .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
            .clone()
    }
}

impl KeyRoulette for RoundRobinKeyRoulette {
    fn next(&self, setting_id: Uuid, raw_keys: &str) -> ProviderResult<String> {
        let keys = split_keys(raw_keys);
        match keys.len() {
            0 => Err(ProviderError::Configuration("no API key configured".to_string())),
            1 => Ok(keys[0].to_string()),
            len => {
                let idx = self.cursor(setting_id).fetch_add(1, Ordering::Relaxed) % len;
                tracing::trace!(pool_size = len, index = idx, "rotating api key");
                Ok(keys[idx].to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn wraps_after_exhausting_pool() {
        let roulette = RoundRobinKeyRoulette::new();
        let id = Uuid::new_v4();
        let picked: Vec<_> = (0..4).map(|_| roulette.next(id, "k0,k1,k2").unwrap()).collect();
        assert_eq!(picked, vec!["k0", "k1", "k2", "k0"]);
    }

    #[test]
    fn single_key_is_always_returned() {
        let roulette = RoundRobinKeyRoulette::new();
        let id = Uuid::new_v4();
        for _ in 0..3 {
            assert_eq!(roulette.next(id, " only-key \n").unwrap(), "only-key");
        }
    }

    #[test]
    fn empty_pool_is_configuration_error() {
        let roulette = RoundRobinKeyRoulette::new();
        assert!(matches!(roulette.next(Uuid::new_v4(), " , "), Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn settings_with_the_same_keys_rotate_independently() {
        let roulette = RoundRobinKeyRoulette::new();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(roulette.next(first, "a b").unwrap(), "a");
        assert_eq!(roulette.next(first, "a b").unwrap(), "b");
        assert_eq!(roulette.next(second, "a b").unwrap(), "a");
        assert_eq!(roulette.next(first, "a b").unwrap(), "a");
        assert_eq!(roulette.next(second, "a b").unwrap(), "b");
    }

    #[test]
    fn edited_pool_keeps_one_cursor_per_setting() {
        let roulette = RoundRobinKeyRoulette::new();
        let id = Uuid::new_v4();
        assert_eq!(roulette.next(id, "a b").unwrap(), "a");
        assert_eq!(roulette.next(id, "a b c").unwrap(), "b");
        assert_eq!(roulette.next(id, "x y").unwrap(), "x");
        assert_eq!(roulette.cursors.lock().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_callers_split_the_pool_evenly() {
        let roulette = Arc::new(RoundRobinKeyRoulette::new());
        let id = Uuid::new_v4();
        let pool = "k0,k1,k2,k3";
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let roulette = roulette.clone();
                std::thread::spawn(move || {
                    (0..100).map(|_| roulette.next(id, pool).unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for key in handle.join().unwrap() {
                *counts.entry(key).or_default() += 1;
            }
        }
        let keys: HashSet<_> = counts.keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        assert!(counts.values().all(|&n| n == 200));
    }
}
