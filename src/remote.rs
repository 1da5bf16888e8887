//! Remote-config backed overrides.
//!
//! A remote-config service delivers a flat table of primitive values that the
//! application fetches and activates on its own schedule. This module only
//! reads the last activated values: [`RemoteConfig`] is the seam to the
//! vendor SDK, and [`RemoteValues`] is an in-process implementation that the
//! fetch code (or a test) feeds with [`activate`](RemoteValues::activate).

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use toml::{Table, Value};

use crate::error::ConfigError;
use crate::provider::Provider;
use crate::signal::Signal;
use crate::types::Override;

pub trait RemoteConfig: Send + Sync {
    /// The activated value for `key`, if the service sent one.
    fn current_value(&self, key: &str) -> Option<Value>;
    /// Fires after each activation.
    fn changes(&self) -> Signal;
}

/// Types a remote-config service can deliver: booleans, integers and strings.
pub trait RemoteConfigurable: Sized {
    fn from_remote(key: &str, value: Value) -> Result<Self, ConfigError>;
}

impl RemoteConfigurable for bool {
    fn from_remote(key: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Boolean(b) => Ok(b),
            // Services commonly ship every parameter as text.
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(type_mismatch(key, "a boolean")),
        }
    }
}

impl RemoteConfigurable for i64 {
    fn from_remote(key: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Integer(i) => Ok(i),
            Value::String(s) => s.trim().parse().map_err(|_| type_mismatch(key, "an integer")),
            _ => Err(type_mismatch(key, "an integer")),
        }
    }
}

impl RemoteConfigurable for String {
    fn from_remote(key: &str, value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::String(s) => Ok(s),
            _ => Err(type_mismatch(key, "a string")),
        }
    }
}

fn type_mismatch(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
    }
}

/// A typed remote-config parameter name.
pub struct RemoteKey<V> {
    name: Arc<str>,
    _phantom: PhantomData<fn() -> V>,
}

impl<V> RemoteKey<V> {
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

impl<V> Clone for RemoteKey<V> {
    fn clone(&self) -> Self {
        Self::new(&self.name)
    }
}

impl<V> fmt::Debug for RemoteKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RemoteKey").field(&self.name).finish()
    }
}

/// The last activated remote table, held in memory.
#[derive(Debug, Default)]
pub struct RemoteValues {
    active: RwLock<Table>,
    changes: Signal,
}

impl RemoteValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every active value with `table` and notify.
    pub fn activate(&self, table: Table) {
        let count = table.len();
        *self.active.write() = table;
        tracing::debug!(values = count, "activated remote config");
        self.changes.emit();
    }

    pub fn keys(&self) -> Vec<String> {
        self.active.read().keys().cloned().collect()
    }
}

impl RemoteConfig for RemoteValues {
    fn current_value(&self, key: &str) -> Option<Value> {
        self.active.read().get(key).cloned()
    }

    fn changes(&self) -> Signal {
        self.changes.clone()
    }
}

/// Overrides with the activated remote value for one key.
pub struct RemoteProvider<V> {
    key: RemoteKey<V>,
    remote: Weak<dyn RemoteConfig>,
    changes: Signal,
}

impl<V> RemoteProvider<V> {
    pub fn new(remote: &Arc<dyn RemoteConfig>, key: RemoteKey<V>) -> Self {
        Self {
            key,
            remote: Arc::downgrade(remote),
            changes: remote.changes(),
        }
    }
}

impl<V: RemoteConfigurable> Provider<V> for RemoteProvider<V> {
    fn value(&self) -> Override<V> {
        let Some(remote) = self.remote.upgrade() else {
            return Override::NoOverride;
        };
        let Some(raw) = remote.current_value(self.key.name()) else {
            return Override::NoOverride;
        };
        match V::from_remote(self.key.name(), raw) {
            Ok(value) => Override::Override(value),
            Err(e) => {
                tracing::warn!(key = self.key.name(), error = %e, "ignoring remote config value");
                Override::NoOverride
            }
        }
    }

    fn changes(&self) -> Option<Signal> {
        Some(self.changes.clone())
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
