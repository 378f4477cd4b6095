//! Type-name keyed creator registry.
//!
//! A model description names component types as strings; the factory maps each
//! key to a creator closure so the kernel never needs compiled-in knowledge of
//! concrete component types.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Outcome of a registry operation, recorded in the status log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterStatus {
    RegisteredOk,
    AlreadyRegistered,
    NotRegistered,
}

type Creator<B> = Box<dyn Fn() -> B + Send + Sync>;

/// Registry mapping keys to creator functions of a common base type `B`.
///
/// The first registration of a key wins; later registrations of the same key
/// are refused and logged as [`RegisterStatus::AlreadyRegistered`].
pub struct ClassFactory<K, B> {
    /// `None` marks a reserved key without a creator.
    creators: HashMap<K, Option<Creator<B>>>,
    /// Keys in first-registration order.
    order: Vec<K>,
    status: Vec<(K, RegisterStatus)>,
}

impl<K, B> Default for ClassFactory<K, B> {
    fn default() -> Self {
        Self {
            creators: HashMap::new(),
            order: Vec::new(),
            status: Vec::new(),
        }
    }
}

impl<K, B> ClassFactory<K, B>
where
    K: Clone + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a creator under `key`. Returns the key.
    pub fn register_creator<F>(&mut self, key: K, creator: F) -> K
    where
        F: Fn() -> B + Send + Sync + 'static,
    {
        if self.creators.contains_key(&key) {
            tracing::warn!(?key, "key already registered, keeping the first creator");
            self.status.push((key.clone(), RegisterStatus::AlreadyRegistered));
        } else {
            self.creators.insert(key.clone(), Some(Box::new(creator)));
            self.order.push(key.clone());
            self.status.push((key.clone(), RegisterStatus::RegisteredOk));
        }
        key
    }

    /// Claim `key` without a creator. Returns false if the key was taken.
    pub fn reserve_key(&mut self, key: K) -> bool {
        if self.creators.contains_key(&key) {
            return false;
        }
        self.creators.insert(key.clone(), None);
        self.order.push(key);
        true
    }

    /// Create an instance for `key`.
    ///
    /// Returns `None` and records [`RegisterStatus::NotRegistered`] if the key
    /// is unknown or only reserved.
    pub fn create_instance(&mut self, key: &K) -> Option<B> {
        if let Some(Some(creator)) = self.creators.get(key) {
            return Some(creator());
        }
        tracing::debug!(?key, "no creator registered");
        self.status.push((key.clone(), RegisterStatus::NotRegistered));
        None
    }

    pub fn has_key(&self, key: &K) -> bool {
        self.creators.contains_key(key)
    }

    /// All registered or reserved keys. Callers must not rely on the order.
    pub fn registered_keys(&self) -> Vec<K> {
        self.order.clone()
    }

    /// Remove the binding for `key`, logging `NotRegistered` if absent.
    pub fn unregister(&mut self, key: &K) {
        if self.creators.remove(key).is_some() {
            self.order.retain(|k| k != key);
        } else {
            self.status.push((key.clone(), RegisterStatus::NotRegistered));
        }
    }

    /// Status log of registrations, failed lookups and failed removals.
    pub fn register_status(&self) -> &[(K, RegisterStatus)] {
        &self.status
    }

    pub fn clear_register_status(&mut self) {
        self.status.clear();
    }

    /// Unregister everything and clear the status log.
    pub fn clear(&mut self) {
        self.creators.clear();
        self.order.clear();
        self.status.clear();
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}
