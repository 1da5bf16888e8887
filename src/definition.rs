//! Configuration definitions and their provider chains.
//!
//! A [`ConfigDefinition`] is declared once, usually in a table of constants
//! built at startup, by chaining attach operations onto a base definition:
//!
//! ```
//! use configchain::{Condition, ConfigDefinition, MemoryStore, StoreKey};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let is_tablet = Condition::new(|| false);
//!
//! let offset: ConfigDefinition<Option<f64>> = ConfigDefinition::new("chart_offset", None)
//!     .when(is_tablet, Some(20.0))
//!     .persisted(&store, StoreKey::new("chart_offset"));
//!
//! assert_eq!(offset.resolve(), None);
//! ```
//!
//! Every attach returns a **new** definition with the same id and default and
//! one more provider at the end of the list. The receiver is never modified,
//! so partially-built chains can be shared and extended independently.
//!
//! # Precedence
//!
//! The provider attached last wins. [`resolve`](ConfigDefinition::resolve)
//! walks the list from the end and stops at the first provider that returns
//! [`Override::Override`]; providers before it are not queried at all. With no
//! override anywhere the default is returned.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::condition::{Condition, ConditionalProvider};
use crate::env::EnvProvider;
use crate::provider::{DynamicProvider, Provider, StaticProvider};
use crate::remote::{RemoteConfig, RemoteConfigurable, RemoteKey, RemoteProvider};
use crate::signal::{ChangeCallback, Signal, Subscription};
use crate::store::{KeyValueStore, StorageMechanism, Storable, StoreKey, StoreProvider};
use crate::tweak::{TweakDefinition, TweakProvider, TweakStore, Tweakable};
use crate::types::Override;
use crate::value::ConfigValue;

static NEXT_ANONYMOUS: AtomicU64 = AtomicU64::new(0);

pub struct ConfigDefinition<V: ConfigValue> {
    id: Arc<str>,
    default: V,
    providers: Arc<[Arc<dyn Provider<V>>]>,
}

impl<V: ConfigValue> ConfigDefinition<V> {
    pub fn new(id: impl Into<String>, default: V) -> Self {
        Self {
            id: Arc::from(id.into()),
            default,
            providers: Arc::from(Vec::new()),
        }
    }

    /// A definition with a generated id, unique within the process.
    pub fn anonymous(default: V) -> Self {
        let n = NEXT_ANONYMOUS.fetch_add(1, Ordering::Relaxed);
        Self::new(format!("anonymous-config-{n}"), default)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn default_value(&self) -> &V {
        &self.default
    }

    /// Providers in attachment order (first attached first).
    pub fn providers(&self) -> &[Arc<dyn Provider<V>>] {
        &self.providers
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Compute the effective value: last attached override wins, else the default.
    pub fn resolve(&self) -> V {
        for provider in self.providers.iter().rev() {
            match provider.value() {
                Override::Override(value) => {
                    tracing::trace!(config = %self.id, provider = provider.name(), "override found");
                    return value;
                }
                Override::NoOverride => {
                    tracing::trace!(config = %self.id, provider = provider.name(), "no override");
                }
            }
        }
        tracing::trace!(config = %self.id, "falling back to default");
        self.default.clone()
    }

    /// Change signals of every provider that has one, in attachment order.
    pub fn signals(&self) -> Vec<Signal> {
        self.providers.iter().filter_map(|p| p.changes()).collect()
    }

    /// Run `callback` whenever any provider signals a change.
    ///
    /// One provider emission produces exactly one call; nothing is
    /// deduplicated beyond that.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe_callback(Arc::new(callback))
    }

    pub fn subscribe_callback(&self, callback: ChangeCallback) -> Subscription {
        Subscription::merge(
            self.signals()
                .iter()
                .map(|signal| signal.subscribe_callback(Arc::clone(&callback))),
        )
    }

    // --- composition ---

    pub fn with_provider<P>(&self, provider: P) -> Self
    where
        P: Provider<V> + 'static,
    {
        self.appended(Arc::new(provider))
    }

    fn appended(&self, provider: Arc<dyn Provider<V>>) -> Self {
        let mut providers: Vec<Arc<dyn Provider<V>>> = self.providers.to_vec();
        providers.push(provider);
        Self {
            id: Arc::clone(&self.id),
            default: self.default.clone(),
            providers: providers.into(),
        }
    }

    /// Always override with `value`.
    pub fn static_value(&self, value: V) -> Self {
        self.with_provider(StaticProvider::new(value))
    }

    /// Ask `callback` on each read; `None` means no override.
    pub fn dynamic<F>(&self, callback: F) -> Self
    where
        F: Fn() -> Option<V> + Send + Sync + 'static,
    {
        self.with_provider(DynamicProvider::new(callback))
    }

    /// Override with `value` while `condition` holds.
    pub fn when(&self, condition: impl Into<Condition>, value: V) -> Self {
        self.when_lazy(condition, move || value.clone())
    }

    /// Override with `value()` while `condition` holds; `value` is only called
    /// when the condition is true.
    pub fn when_lazy<F>(&self, condition: impl Into<Condition>, value: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.with_provider(ConditionalProvider::new(condition.into(), value))
    }

    /// Override with whatever `store` holds under `key`.
    pub fn persisted<S>(&self, store: &Arc<S>, key: StoreKey<V>) -> Self
    where
        S: KeyValueStore + 'static,
        V: Storable,
    {
        self.persisted_with(store, key, StorageMechanism::default())
    }

    /// Like [`persisted`](Self::persisted) with an explicit encoding.
    pub fn persisted_with<S>(
        &self,
        store: &Arc<S>,
        key: StoreKey<V>,
        mechanism: StorageMechanism<V>,
    ) -> Self
    where
        S: KeyValueStore + 'static,
    {
        let store: Arc<dyn KeyValueStore> = Arc::clone(store) as Arc<dyn KeyValueStore>;
        self.with_provider(StoreProvider::new(&store, key, mechanism))
    }

    /// Override with the last activated remote-config value for `key`.
    pub fn remote_config<R>(&self, remote: &Arc<R>, key: RemoteKey<V>) -> Self
    where
        R: RemoteConfig + 'static,
        V: RemoteConfigurable,
    {
        let remote: Arc<dyn RemoteConfig> = Arc::clone(remote) as Arc<dyn RemoteConfig>;
        self.with_provider(RemoteProvider::new(&remote, key))
    }

    /// Register a developer tweak `"{category} {section} {name}"` and override
    /// with its value whenever one has been set.
    pub fn tweak(&self, tweaks: &Arc<TweakStore>, category: &str, section: &str, name: &str) -> Self
    where
        V: Tweakable,
    {
        let definition = TweakDefinition::new(category, section, name, self.resolve());
        self.tweak_with(tweaks, definition)
    }

    pub fn tweak_with(&self, tweaks: &Arc<TweakStore>, definition: TweakDefinition<V>) -> Self
    where
        V: Tweakable,
    {
        let id = tweaks.register(definition);
        self.with_provider(TweakProvider::new(tweaks, id))
    }

    /// Override with the parsed contents of environment variable `name`.
    pub fn env_var(&self, name: &str) -> Self
    where
        V: Storable,
    {
        self.with_provider(EnvProvider::new(name))
    }

    /// Like [`env_var`](Self::env_var) with an injected lookup, for tests.
    pub fn env_var_from<F>(&self, name: &str, lookup: F) -> Self
    where
        V: Storable,
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.with_provider(EnvProvider::with_lookup(name, lookup))
    }
}

impl<V: ConfigValue> Clone for ConfigDefinition<V> {
    fn clone(&self) -> Self {
        Self {
            id: Arc::clone(&self.id),
            default: self.default.clone(),
            providers: Arc::clone(&self.providers),
        }
    }
}

/// Definitions are equal when their ids are; default and providers are not
/// compared.
impl<V: ConfigValue> PartialEq for ConfigDefinition<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V: ConfigValue> Eq for ConfigDefinition<V> {}

impl<V: ConfigValue> Hash for ConfigDefinition<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<V: ConfigValue + fmt::Debug> fmt::Debug for ConfigDefinition<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigDefinition")
            .field("id", &self.id)
            .field("default", &self.default)
            .field("providers", &self.provider_names())
            .finish()
    }
}

/// The type-erased view of a definition that a repository keeps.
pub trait AnyDefinition: Send + Sync {
    fn id(&self) -> &str;
    fn provider_names(&self) -> Vec<&'static str>;
    fn subscribe_callback(&self, callback: ChangeCallback) -> Subscription;
}

impl<V: ConfigValue> AnyDefinition for ConfigDefinition<V> {
    fn id(&self) -> &str {
        ConfigDefinition::id(self)
    }

    fn provider_names(&self) -> Vec<&'static str> {
        ConfigDefinition::provider_names(self)
    }

    fn subscribe_callback(&self, callback: ChangeCallback) -> Subscription {
        ConfigDefinition::subscribe_callback(self, callback)
    }
}
