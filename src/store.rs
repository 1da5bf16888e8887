//! Persisted key-value stores and the provider that reads them.
//!
//! The library does not own persistence. A store is anything implementing
//! [`KeyValueStore`]: untyped `get`/`set`/`remove` of [`toml::Value`]
//! primitives plus one coarse "something in the store changed" [`Signal`].
//! Two implementations ship with the crate: [`MemoryStore`] here and
//! [`FileStore`](crate::FileStore), a TOML file on disk.
//!
//! Typing happens at the edge:
//!
//! - [`StoreKey<V>`] names a slot and fixes its value type.
//! - [`Storable`] is the per-type default encoding. It is implemented for
//!   booleans, integers, floats, strings, `Option<T>` (storing `None` removes
//!   the key) and `Vec<T>`.
//! - [`StorageMechanism<V>`] is an explicit encoding chosen when the provider is
//!   attached: the `Storable` default, JSON text via
//!   [`json`](StorageMechanism::json), `FromStr`/`Display` text via
//!   [`parsed`](StorageMechanism::parsed), or any
//!   [`pullback`](StorageMechanism::pullback) of another mechanism.
//!
//! [`StoreProvider`] never fails resolution: read errors and decode errors are
//! logged and become [`Override::NoOverride`].

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use toml::Value;

use crate::error::ConfigError;
use crate::provider::Provider;
use crate::signal::Signal;
use crate::types::Override;

/// Untyped persisted storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, ConfigError>;
    fn set(&self, key: &str, value: Value) -> Result<(), ConfigError>;
    fn remove(&self, key: &str) -> Result<(), ConfigError>;
    /// Fires after any write to any key.
    fn changes(&self) -> Signal;
}

/// A typed name for one slot in a [`KeyValueStore`].
pub struct StoreKey<V> {
    name: Arc<str>,
    _phantom: PhantomData<fn() -> V>,
}

impl<V> StoreKey<V> {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            _phantom: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<V> Clone for StoreKey<V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            _phantom: PhantomData,
        }
    }
}

impl<V> fmt::Debug for StoreKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreKey").field(&self.name).finish()
    }
}

impl<V> From<&str> for StoreKey<V> {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Default encoding of a type into a store primitive.
pub trait Storable: Sized {
    /// `None` means "remove the key".
    fn encode(&self) -> Option<Value>;
    fn decode(key: &str, value: Value) -> Result<Self, ConfigError>;

    /// [`encode`](Storable::encode) for a write under `key`. Fails where a
    /// value has a part that cannot be stored.
    fn encode_for(&self, _key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.encode())
    }
}

fn mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

impl Storable for bool {
    fn encode(&self) -> Option<Value> {
        Some(Value::Boolean(*self))
    }

    fn decode(key: &str, value: Value) -> Result<Self, ConfigError> {
        value.as_bool().ok_or_else(|| mismatch(key, "a boolean"))
    }
}

impl Storable for String {
    fn encode(&self) -> Option<Value> {
        Some(Value::String(self.clone()))
    }

    fn decode(key: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::String(s) => Ok(s),
            _ => Err(mismatch(key, "a string")),
        }
    }
}

macro_rules! storable_int {
    ($($ty:ty),*) => {
        $(
            impl Storable for $ty {
                fn encode(&self) -> Option<Value> {
                    Some(Value::Integer(i64::from(*self)))
                }

                fn decode(key: &str, value: Value) -> Result<Self, ConfigError> {
                    let raw = value.as_integer().ok_or_else(|| mismatch(key, "an integer"))?;
                    <$ty>::try_from(raw).map_err(|_| mismatch(key, concat!("within range of ", stringify!($ty))))
                }
            }
        )*
    };
}

storable_int!(i8, i16, i32, i64, u8, u16, u32);

impl Storable for f64 {
    fn encode(&self) -> Option<Value> {
        Some(Value::Float(*self))
    }

    fn decode(key: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            _ => Err(mismatch(key, "a float")),
        }
    }
}

impl Storable for f32 {
    fn encode(&self) -> Option<Value> {
        Some(Value::Float(f64::from(*self)))
    }

    fn decode(key: &str, value: Value) -> Result<Self, ConfigError> {
        f64::decode(key, value).map(|f| f as f32)
    }
}

impl<T: Storable> Storable for Option<T> {
    fn encode(&self) -> Option<Value> {
        self.as_ref().and_then(Storable::encode)
    }

    fn encode_for(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        match self {
            Some(value) => value.encode_for(key),
            None => Ok(None),
        }
    }

    fn decode(key: &str, value: Value) -> Result<Self, ConfigError> {
        T::decode(key, value).map(Some)
    }
}

/// TOML arrays cannot hold an absent value, so a vector with an element that
/// encodes to nothing has no encoding and writing it fails.
impl<T: Storable> Storable for Vec<T> {
    fn encode(&self) -> Option<Value> {
        self.iter()
            .map(Storable::encode)
            .collect::<Option<Vec<_>>>()
            .map(Value::Array)
    }

    fn encode_for(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        let mut items = Vec::with_capacity(self.len());
        for item in self {
            match item.encode_for(key)? {
                Some(encoded) => items.push(encoded),
                None => return Err(mismatch(key, "array elements that are all present")),
            }
        }
        Ok(Some(Value::Array(items)))
    }

    fn decode(key: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Array(items) => items.into_iter().map(|item| T::decode(key, item)).collect(),
            _ => Err(mismatch(key, "an array")),
        }
    }
}

type StoreFn<V> = Arc<dyn Fn(&dyn KeyValueStore, &str, Option<&V>) -> Result<(), ConfigError> + Send + Sync>;
type RetrieveFn<V> = Arc<dyn Fn(&dyn KeyValueStore, &str) -> Result<Option<V>, ConfigError> + Send + Sync>;

/// How values of type `V` are written to and read from a store.
pub struct StorageMechanism<V> {
    store: StoreFn<V>,
    retrieve: RetrieveFn<V>,
}

impl<V: 'static> StorageMechanism<V> {
    pub fn new<S, R>(store: S, retrieve: R) -> Self
    where
        S: Fn(&dyn KeyValueStore, &str, Option<&V>) -> Result<(), ConfigError> + Send + Sync + 'static,
        R: Fn(&dyn KeyValueStore, &str) -> Result<Option<V>, ConfigError> + Send + Sync + 'static,
    {
        Self {
            store: Arc::new(store),
            retrieve: Arc::new(retrieve),
        }
    }

    /// Write `value` under `key`; `None` removes it.
    pub fn store(&self, store: &dyn KeyValueStore, key: &str, value: Option<&V>) -> Result<(), ConfigError> {
        (self.store)(store, key, value)
    }

    pub fn retrieve(&self, store: &dyn KeyValueStore, key: &str) -> Result<Option<V>, ConfigError> {
        (self.retrieve)(store, key)
    }

    /// Derive a mechanism for `W` that stores through this one.
    ///
    /// `forward` turns a retrieved `V` into a `W`; `back` turns a `W` into the
    /// `V` to store. Both receive the key for error reporting.
    pub fn pullback<W, F, B>(self, forward: F, back: B) -> StorageMechanism<W>
    where
        W: 'static,
        F: Fn(&str, V) -> Result<W, ConfigError> + Send + Sync + 'static,
        B: Fn(&str, &W) -> Result<V, ConfigError> + Send + Sync + 'static,
    {
        let inner_store = self.store;
        let inner_retrieve = self.retrieve;
        StorageMechanism::new(
            move |store: &dyn KeyValueStore, key: &str, value: Option<&W>| {
                let converted = value.map(|w| back(key, w)).transpose()?;
                inner_store(store, key, converted.as_ref())
            },
            move |store: &dyn KeyValueStore, key: &str| {
                inner_retrieve(store, key)?
                    .map(|v| forward(key, v))
                    .transpose()
            },
        )
    }
}

impl<V: Storable + 'static> Default for StorageMechanism<V> {
    fn default() -> Self {
        Self::new(
            |store, key, value: Option<&V>| {
                match value.map(|v| v.encode_for(key)).transpose()?.flatten() {
                    Some(encoded) => store.set(key, encoded),
                    None => store.remove(key),
                }
            },
            |store, key| store.get(key)?.map(|raw| V::decode(key, raw)).transpose(),
        )
    }
}

impl<W: Serialize + DeserializeOwned + 'static> StorageMechanism<W> {
    /// Store `W` as JSON text in a string slot.
    pub fn json() -> Self {
        StorageMechanism::<String>::default().pullback(
            |key, text| {
                serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                    key: key.to_string(),
                    source,
                })
            },
            |key, value| {
                serde_json::to_string(value).map_err(|source| ConfigError::Json {
                    key: key.to_string(),
                    source,
                })
            },
        )
    }
}

impl<W: FromStr + fmt::Display + 'static> StorageMechanism<W> {
    /// Store `W` as its `Display` text, reading it back with `FromStr`.
    pub fn parsed() -> Self {
        StorageMechanism::<String>::default().pullback(
            |key, text| {
                text.parse()
                    .map_err(|_| mismatch(key, "text accepted by FromStr"))
            },
            |_, value: &W| Ok(value.to_string()),
        )
    }
}

impl<V> Clone for StorageMechanism<V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            retrieve: Arc::clone(&self.retrieve),
        }
    }
}

/// Typed reads and writes on any store.
pub trait TypedStore {
    fn read<V: Storable>(&self, key: &StoreKey<V>) -> Result<Option<V>, ConfigError>;
    /// `None` (or a value that encodes to nothing) removes the key.
    fn write<V: Storable>(&self, key: &StoreKey<V>, value: Option<V>) -> Result<(), ConfigError>;
}

impl<S: KeyValueStore + ?Sized> TypedStore for S {
    fn read<V: Storable>(&self, key: &StoreKey<V>) -> Result<Option<V>, ConfigError> {
        self.get(key.name())?
            .map(|raw| V::decode(key.name(), raw))
            .transpose()
    }

    fn write<V: Storable>(&self, key: &StoreKey<V>, value: Option<V>) -> Result<(), ConfigError> {
        let encoded = value.map(|v| v.encode_for(key.name())).transpose()?.flatten();
        match encoded {
            Some(encoded) => self.set(key.name(), encoded),
            None => self.remove(key.name()),
        }
    }
}

/// In-process store. Every write emits [`changes`](KeyValueStore::changes).
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
    changes: Signal,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.lock().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.values.lock().clear();
        self.changes.emit();
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        self.values.lock().insert(key.to_string(), value);
        self.changes.emit();
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        self.values.lock().remove(key);
        self.changes.emit();
        Ok(())
    }

    fn changes(&self) -> Signal {
        self.changes.clone()
    }
}

/// Overrides with the value a store holds under one key.
///
/// Holds only a weak reference: once the store is dropped the provider has no
/// opinion.
pub struct StoreProvider<V> {
    key: StoreKey<V>,
    store: Weak<dyn KeyValueStore>,
    mechanism: StorageMechanism<V>,
    changes: Signal,
}

impl<V> StoreProvider<V> {
    pub fn new(store: &Arc<dyn KeyValueStore>, key: StoreKey<V>, mechanism: StorageMechanism<V>) -> Self {
        Self {
            key,
            store: Arc::downgrade(store),
            mechanism,
            changes: store.changes(),
        }
    }
}

impl<V: 'static> Provider<V> for StoreProvider<V> {
    fn value(&self) -> Override<V> {
        let Some(store) = self.store.upgrade() else {
            return Override::NoOverride;
        };
        match self.mechanism.retrieve(&*store, self.key.name()) {
            Ok(value) => value.into(),
            Err(e) => {
                tracing::warn!(key = self.key.name(), error = %e, "ignoring unreadable stored value");
                Override::NoOverride
            }
        }
    }

    fn changes(&self) -> Option<Signal> {
        Some(self.changes.clone())
    }

    fn name(&self) -> &'static str {
        "store"
    }
}
