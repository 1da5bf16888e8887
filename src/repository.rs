//! The registry that resolves definitions and fans their changes in.
//!
//! Resolution itself does not need registration: [`ConfigRepository::get`]
//! works for any definition. Registering with [`add`](ConfigRepository::add)
//! wires the definition's provider signals into the repository-wide
//! [`changes`](ConfigRepository::changes) signal, which a UI layer can watch
//! to re-render on "anything changed".
//!
//! Typed observation goes through [`listen`](ConfigRepository::listen) (future
//! changes only) or [`watch`](ConfigRepository::watch) (current value first).
//! Both re-resolve on every provider emission and drop consecutive duplicates.
//! Callbacks run on whichever thread emitted the provider signal.
//!
//! Mutation takes `&mut self`; there is no internal locking of the registry.
//! Share a repository across threads behind your own lock, or use
//! [`global::repository`](crate::global::repository).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::definition::{AnyDefinition, ConfigDefinition};
use crate::error::ConfigError;
use crate::signal::{Signal, Subscription};
use crate::value::ConfigValue;

/// Handle returned by [`ConfigRepository::listen`] and [`ConfigRepository::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct ConfigRepository {
    definitions: Vec<Arc<dyn AnyDefinition>>,
    forwarding: Vec<Subscription>,
    listeners: HashMap<ListenerId, Subscription>,
    next_listener: u64,
    changes: Signal,
}

impl ConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition so its changes reach [`changes`](Self::changes).
    ///
    /// Ids are unique within a repository: registering a second definition
    /// with an id that is already present fails with
    /// [`ConfigError::DuplicateId`] and leaves the first one in place.
    pub fn add<V: ConfigValue>(&mut self, definition: &ConfigDefinition<V>) -> Result<(), ConfigError> {
        self.add_any(Arc::new(definition.clone()))
    }

    pub fn add_any(&mut self, definition: Arc<dyn AnyDefinition>) -> Result<(), ConfigError> {
        if self.contains(definition.id()) {
            tracing::warn!(config = definition.id(), "rejecting duplicate registration");
            return Err(ConfigError::DuplicateId(definition.id().to_string()));
        }

        let changes = self.changes.clone();
        let forwarding = definition.subscribe_callback(Arc::new(move || changes.emit()));
        tracing::debug!(
            config = definition.id(),
            providers = ?definition.provider_names(),
            signals = forwarding.len(),
            "registered config"
        );

        self.forwarding.push(forwarding);
        self.definitions.push(definition);
        Ok(())
    }

    /// Register several definitions in order, stopping at the first duplicate.
    pub fn add_all(
        &mut self,
        definitions: impl IntoIterator<Item = Arc<dyn AnyDefinition>>,
    ) -> Result<(), ConfigError> {
        for definition in definitions {
            self.add_any(definition)?;
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.iter().any(|d| d.id() == id)
    }

    /// Registered definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &dyn AnyDefinition> {
        self.definitions.iter().map(|d| d.as_ref())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// The effective value of `definition` right now.
    pub fn get<V: ConfigValue>(&self, definition: &ConfigDefinition<V>) -> V {
        definition.resolve()
    }

    pub fn is_on(&self, definition: &ConfigDefinition<bool>) -> bool {
        self.get(definition)
    }

    pub fn is_off(&self, definition: &ConfigDefinition<bool>) -> bool {
        !self.is_on(definition)
    }

    /// Fires whenever any registered definition's providers signal a change.
    pub fn changes(&self) -> &Signal {
        &self.changes
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.changes.subscribe(callback)
    }

    /// Call `on_change` with the new effective value each time it changes.
    ///
    /// The value at the time of the call is the baseline: an emission that
    /// resolves to the same value as the last one delivered (or the baseline)
    /// is dropped. No value is delivered up front; use
    /// [`watch`](Self::watch) for that.
    pub fn listen<V, F>(&mut self, definition: &ConfigDefinition<V>, on_change: F) -> ListenerId
    where
        V: ConfigValue + PartialEq,
        F: Fn(V) + Send + Sync + 'static,
    {
        let baseline = definition.resolve();
        self.register_listener(definition, baseline, on_change)
    }

    /// Like [`listen`](Self::listen), but first calls `on_change` with the
    /// current value before returning.
    pub fn watch<V, F>(&mut self, definition: &ConfigDefinition<V>, on_change: F) -> ListenerId
    where
        V: ConfigValue + PartialEq,
        F: Fn(V) + Send + Sync + 'static,
    {
        let current = definition.resolve();
        on_change(current.clone());
        self.register_listener(definition, current, on_change)
    }

    fn register_listener<V, F>(
        &mut self,
        definition: &ConfigDefinition<V>,
        baseline: V,
        on_change: F,
    ) -> ListenerId
    where
        V: ConfigValue + PartialEq,
        F: Fn(V) + Send + Sync + 'static,
    {
        let last = Mutex::new(baseline);
        let observed = definition.clone();
        let subscription = definition.subscribe(move || {
            let value = observed.resolve();
            {
                let mut last = last.lock();
                if *last == value {
                    return;
                }
                *last = value.clone();
            }
            tracing::debug!(config = observed.id(), "delivering changed value");
            on_change(value);
        });

        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, subscription);
        id
    }

    /// Stop a listener. Returns `false` if it was already removed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for ConfigRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.definitions.iter().map(|d| d.id()).collect();
        f.debug_struct("ConfigRepository")
            .field("definitions", &ids)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::fixtures::test::ManualProvider;
    use crate::store::{MemoryStore, StoreKey, TypedStore};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn recorder<V: Send + 'static>() -> (Arc<Mutex<Vec<V>>>, impl Fn(V) + Send + Sync + 'static) {
        let seen: Arc<Mutex<Vec<V>>> = Arc::default();
        let s = Arc::clone(&seen);
        (seen, move |v| s.lock().push(v))
    }

    #[test]
    fn get_works_without_registration() {
        let repo = ConfigRepository::new();
        let def = ConfigDefinition::new("n", 7);
        assert_eq!(repo.get(&def), 7);
        assert_eq!(repo.get(&def), 7);
    }

    #[test]
    fn is_on_and_is_off() {
        let repo = ConfigRepository::new();
        let on = ConfigDefinition::new("on", false).static_value(true);
        assert!(repo.is_on(&on));
        assert!(!repo.is_off(&on));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut repo = ConfigRepository::new();
        let first = ConfigDefinition::new("dup", 1);
        let second = ConfigDefinition::new("dup", 2);

        repo.add(&first).unwrap();
        let err = repo.add(&second).unwrap_err();

        assert!(matches!(err, ConfigError::DuplicateId(id) if id == "dup"));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn add_all_registers_in_order() {
        let mut repo = ConfigRepository::new();
        let defs: Vec<Arc<dyn AnyDefinition>> = vec![
            Arc::new(ConfigDefinition::new("a", true)),
            Arc::new(ConfigDefinition::new("b", 1)),
            Arc::new(ConfigDefinition::new("c", "x".to_string())),
        ];
        repo.add_all(defs).unwrap();

        let ids: Vec<&str> = repo.definitions().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(repo.contains("b"));
    }

    #[test]
    fn registered_changes_reach_repository_signal() {
        let mut repo = ConfigRepository::new();
        let provider = ManualProvider::new(None::<i32>);
        let def = ConfigDefinition::new("n", 0).with_provider(provider.clone());
        repo.add(&def).unwrap();

        let events = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&events);
        let _sub = repo.subscribe(move || {
            e.fetch_add(1, Ordering::SeqCst);
        });

        provider.set(Some(1));
        provider.set(Some(1));
        assert_eq!(events.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unregistered_changes_do_not_reach_repository_signal() {
        let repo = ConfigRepository::new();
        let provider = ManualProvider::new(None::<i32>);
        let _def = ConfigDefinition::new("n", 0).with_provider(provider.clone());

        let events = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&events);
        let _sub = repo.subscribe(move || {
            e.fetch_add(1, Ordering::SeqCst);
        });

        provider.set(Some(1));
        assert_eq!(events.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listen_drops_consecutive_duplicates() {
        let mut repo = ConfigRepository::new();
        let provider = ManualProvider::new(Some(3));
        let def = ConfigDefinition::new("n", 0).with_provider(provider.clone());
        let (seen, on_change) = recorder();
        repo.listen(&def, on_change);

        provider.set(Some(3));
        provider.set(Some(4));

        assert_eq!(*seen.lock(), vec![4]);
    }

    #[test]
    fn listen_delivers_nothing_up_front() {
        let mut repo = ConfigRepository::new();
        let provider = ManualProvider::new(Some(1));
        let def = ConfigDefinition::new("n", 0).with_provider(provider);
        let (seen, on_change) = recorder();
        repo.listen(&def, on_change);

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn listen_reports_return_to_default() {
        let mut repo = ConfigRepository::new();
        let provider = ManualProvider::new(None);
        let def = ConfigDefinition::new("n", 0).with_provider(provider.clone());
        let (seen, on_change) = recorder();
        repo.listen(&def, on_change);

        provider.set(Some(5));
        provider.set(None);
        provider.set(None);

        assert_eq!(*seen.lock(), vec![5, 0]);
    }

    #[test]
    fn change_masked_by_higher_provider_is_suppressed() {
        let mut repo = ConfigRepository::new();
        let lower = ManualProvider::new(Some(1));
        let def = ConfigDefinition::new("n", 0)
            .with_provider(lower.clone())
            .static_value(10);
        let (seen, on_change) = recorder();
        repo.listen(&def, on_change);

        lower.set(Some(2));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn watch_delivers_current_value_first() {
        let mut repo = ConfigRepository::new();
        let provider = ManualProvider::new(Some(1));
        let def = ConfigDefinition::new("n", 0).with_provider(provider.clone());
        let (seen, on_change) = recorder();
        repo.watch(&def, on_change);

        provider.set(Some(1));
        provider.set(Some(2));

        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn removed_listener_stops_receiving() {
        let mut repo = ConfigRepository::new();
        let provider = ManualProvider::new(None);
        let def = ConfigDefinition::new("n", 0).with_provider(provider.clone());
        let (seen, on_change) = recorder();
        let id = repo.listen(&def, on_change);

        provider.set(Some(1));
        assert!(repo.remove_listener(id));
        assert!(!repo.remove_listener(id));
        provider.set(Some(2));

        assert_eq!(*seen.lock(), vec![1]);
        assert_eq!(repo.listener_count(), 0);
    }

    #[test]
    fn removing_listener_that_owns_a_subscription() {
        let mut repo = ConfigRepository::new();
        let provider = ManualProvider::new(None);
        let def = ConfigDefinition::new("n", 0).with_provider(provider.clone());
        let owned = provider.signal().subscribe(|| {});
        let id = repo.listen(&def, move |_: i32| {
            let _keep = &owned;
        });
        assert_eq!(provider.signal().subscriber_count(), 2);

        assert!(repo.remove_listener(id));
        assert_eq!(provider.signal().subscriber_count(), 0);
    }

    #[test]
    fn dropping_repository_releases_subscriptions() {
        let provider = ManualProvider::new(None::<i32>);
        let def = ConfigDefinition::new("n", 0).with_provider(provider.clone());
        {
            let mut repo = ConfigRepository::new();
            repo.add(&def).unwrap();
            repo.listen(&def, |_| {});
            assert_eq!(provider.signal().subscriber_count(), 2);
        }
        assert_eq!(provider.signal().subscriber_count(), 0);
    }

    #[test]
    fn attachment_order_beats_condition() {
        let store = Arc::new(MemoryStore::new());
        let key: StoreKey<bool> = StoreKey::new("secret_new_feature");
        let predicate = Arc::new(AtomicBool::new(false));
        let p = Arc::clone(&predicate);

        let flag = ConfigDefinition::new("secret_new_feature", false)
            .when(Condition::new(move || p.load(Ordering::SeqCst)), true)
            .persisted(&store, key.clone());

        let mut repo = ConfigRepository::new();
        repo.add(&flag).unwrap();
        let (seen, on_change) = recorder();
        repo.listen(&flag, on_change);

        assert!(!repo.get(&flag));

        predicate.store(true, Ordering::SeqCst);
        assert!(repo.get(&flag));

        store.write(&key, Some(false)).unwrap();
        assert!(!repo.get(&flag));

        predicate.store(false, Ordering::SeqCst);
        assert!(!repo.get(&flag));

        // The predicate flip emits nothing; only the store write did, and it
        // resolved to the same value as the listen-time baseline.
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn store_write_notifies_listener() {
        let store = Arc::new(MemoryStore::new());
        let key: StoreKey<i64> = StoreKey::new("free_items");
        let def = ConfigDefinition::new("free_items", 1).persisted(&store, key.clone());

        let mut repo = ConfigRepository::new();
        let (seen, on_change) = recorder();
        repo.listen(&def, on_change);

        store.write(&key, Some(100)).unwrap();
        store.write(&key, None).unwrap();

        assert_eq!(*seen.lock(), vec![100, 1]);
    }
}
