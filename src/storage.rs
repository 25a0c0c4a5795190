//! Registry state for the wirer
//!
//! Uses DashMap for the constructor table and short-lived `parking_lot`
//! locks for everything that is ordered. No lock is ever held while user
//! code runs, so factories and listeners may call back into the wirer.

use crate::factory::ConstructorInfo;
use crate::listener::InstantiationListener;
use crate::{DiError, Instance, Result, TypeKey};
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A built singleton and the constructor it came from (absent for values
/// that were handed in pre-built).
#[derive(Clone)]
pub struct SingletonRecord {
    pub(crate) instance: Instance,
    pub(crate) constructor: Option<Arc<ConstructorInfo>>,
}

impl SingletonRecord {
    /// The singleton value
    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The constructor that built it, if any
    #[inline]
    pub fn constructor(&self) -> Option<&ConstructorInfo> {
        self.constructor.as_deref()
    }
}

impl std::fmt::Debug for SingletonRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonRecord")
            .field("type", &self.instance.concrete_key())
            .field("constructed", &self.constructor.is_some())
            .finish()
    }
}

/// A registered constructor and when it was registered
struct Registered {
    sequence: u64,
    info: Arc<ConstructorInfo>,
}

/// Everything one wirer owns.
pub(crate) struct Registry {
    /// Registered constructors, at most one per concrete key
    constructors: DashMap<TypeKey, Registered, RandomState>,
    /// Registration counter, keeps wiring order deterministic
    sequence: AtomicU64,
    /// Built singletons in construction order
    singletons: Mutex<Vec<SingletonRecord>>,
    /// Keys on the active resolution stack
    constructing: Mutex<HashSet<TypeKey, RandomState>>,
    /// Keys that ever went through the guard
    encountered: Mutex<HashSet<TypeKey, RandomState>>,
    /// Pre-built values waiting for listener dispatch during `wire`
    notify_on_wire: Mutex<Vec<Instance>>,
    /// Instantiation listeners in registration order
    pub(crate) listeners: Mutex<Vec<Arc<InstantiationListener>>>,
    /// Never release the guard once a key was encountered
    retain_encountered: bool,
}

impl Registry {
    pub fn new(capacity: usize, retain_encountered: bool) -> Self {
        Self {
            constructors: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                8,
            ),
            sequence: AtomicU64::new(0),
            singletons: Mutex::new(Vec::with_capacity(capacity + 1)),
            constructing: Mutex::new(HashSet::with_hasher(RandomState::new())),
            encountered: Mutex::new(HashSet::with_hasher(RandomState::new())),
            notify_on_wire: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            retain_encountered,
        }
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    /// Insert or overwrite the constructor for its concrete key
    pub fn insert_constructor(&self, info: ConstructorInfo) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.constructors.insert(
            info.produces(),
            Registered {
                sequence,
                info: Arc::new(info),
            },
        );
    }

    /// Concrete keys of every registered constructor, in registration order
    pub fn constructor_keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<(u64, TypeKey)> = self
            .constructors
            .iter()
            .map(|entry| (entry.value().sequence, *entry.key()))
            .collect();
        keys.sort_unstable_by_key(|(sequence, _)| *sequence);
        keys.into_iter().map(|(_, key)| key).collect()
    }

    pub fn constructor_count(&self) -> usize {
        self.constructors.len()
    }

    pub fn clear_constructors(&self) {
        self.constructors.clear();
    }

    /// Find the one constructor whose product can be requested as `key`.
    pub fn find_constructor(&self, key: TypeKey) -> Result<Option<Arc<ConstructorInfo>>> {
        let mut candidates: Vec<(u64, Arc<ConstructorInfo>)> = self
            .constructors
            .iter()
            .filter(|entry| entry.value().info.is_assignable_to(key))
            .map(|entry| (entry.value().sequence, Arc::clone(&entry.value().info)))
            .collect();
        candidates.sort_unstable_by_key(|(sequence, _)| *sequence);

        if candidates.len() > 1 {
            return Err(DiError::AmbiguousConstructor {
                type_name: key.name(),
                candidates: candidates.iter().map(|(_, info)| info.produces().name()).collect(),
            });
        }

        Ok(candidates.into_iter().next().map(|(_, info)| info))
    }

    // =========================================================================
    // Singletons
    // =========================================================================

    pub fn push_singleton(&self, instance: Instance, constructor: Option<Arc<ConstructorInfo>>) {
        self.singletons.lock().push(SingletonRecord {
            instance,
            constructor,
        });
    }

    /// Remove and return the most recently added singleton
    pub fn pop_singleton(&self) -> Option<SingletonRecord> {
        self.singletons.lock().pop()
    }

    pub fn singleton_count(&self) -> usize {
        self.singletons.lock().len()
    }

    /// Copy of the records in construction order
    pub fn singletons(&self) -> Vec<SingletonRecord> {
        self.singletons.lock().clone()
    }

    /// The unique existing singleton that can be requested as `key`.
    pub fn find_instance(&self, key: TypeKey) -> Result<Option<Instance>> {
        let singletons = self.singletons.lock();
        let mut matches = singletons.iter().filter(|record| record.instance.is_instance(key));

        let Some(first) = matches.next() else {
            return Ok(None);
        };

        let rest: Vec<&SingletonRecord> = matches.collect();
        if !rest.is_empty() {
            return Err(DiError::AmbiguousInstance {
                type_name: key.name(),
                candidates: std::iter::once(first)
                    .chain(rest)
                    .map(|record| record.instance.type_name())
                    .collect(),
            });
        }

        Ok(Some(first.instance.clone()))
    }

    // =========================================================================
    // Listener queue for pre-built values
    // =========================================================================

    pub fn queue_for_listeners(&self, instance: Instance) {
        self.notify_on_wire.lock().push(instance);
    }

    pub fn queued_for_listeners(&self) -> Vec<Instance> {
        self.notify_on_wire.lock().clone()
    }

    pub fn clear_listener_queue(&self) {
        self.notify_on_wire.lock().clear();
    }

    // =========================================================================
    // Construction guard
    // =========================================================================

    /// Mark `key` as under construction.
    ///
    /// Fails if it already is (or, with `retain_encountered`, if it was ever
    /// marked before).
    pub fn enter(&self, key: TypeKey, parent: Option<TypeKey>) -> Result<()> {
        let first_encounter = self.encountered.lock().insert(key);
        let newly_constructing = self.constructing.lock().insert(key);

        let rejected = if self.retain_encountered {
            !first_encounter
        } else {
            !newly_constructing
        };

        if rejected {
            if newly_constructing {
                self.constructing.lock().remove(&key);
            }
            return Err(DiError::circular(key.name(), parent.map(|p| p.name())));
        }
        Ok(())
    }

    /// Construction of `key` finished, successfully or not
    pub fn leave(&self, key: TypeKey) {
        self.constructing.lock().remove(&key);
    }

    #[cfg(test)]
    pub fn was_encountered(&self, key: TypeKey) -> bool {
        self.encountered.lock().contains(&key)
    }

    #[cfg(test)]
    pub fn is_constructing(&self, key: TypeKey) -> bool {
        self.constructing.lock().contains(&key)
    }

    pub fn forget_encountered(&self) {
        self.encountered.lock().clear();
    }
}
