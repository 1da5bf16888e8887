//! The provider abstraction and the two trivial providers.
//!
//! A provider answers one question for one configuration: "do you want to
//! override the value right now?" It may read external state (a store, a
//! remote cache, an environment variable) but must not mutate it, and it must
//! be total: failures are converted into [`Override::NoOverride`] inside the
//! provider, never surfaced through resolution.

use crate::signal::Signal;
use crate::types::Override;

/// A source that can optionally supply a value for one configuration.
pub trait Provider<V>: Send + Sync {
    /// Query the current override. Called during every resolution that reaches
    /// this provider.
    fn value(&self) -> Override<V>;

    /// Signal fired when the external state behind [`value`](Self::value) may
    /// have changed. `None` means the answer never changes.
    fn changes(&self) -> Option<Signal> {
        None
    }

    /// Short name used in logs and listings.
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// `"configchain::provider::StaticProvider<i32>"` → `"StaticProvider"`.
fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// Always overrides with a fixed value.
#[derive(Debug, Clone)]
pub struct StaticProvider<V> {
    value: V,
}

impl<V> StaticProvider<V> {
    pub fn new(value: V) -> Self {
        Self { value }
    }
}

impl<V: Clone + Send + Sync> Provider<V> for StaticProvider<V> {
    fn value(&self) -> Override<V> {
        Override::Override(self.value.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Asks a callback each time; `None` from the callback means no override.
pub struct DynamicProvider<F> {
    callback: F,
    changes: Option<Signal>,
}

impl<F> DynamicProvider<F> {
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            changes: None,
        }
    }

    /// Pair the callback with a signal the caller fires when its answer changes.
    pub fn with_changes(callback: F, changes: Signal) -> Self {
        Self {
            callback,
            changes: Some(changes),
        }
    }
}

impl<V, F> Provider<V> for DynamicProvider<F>
where
    F: Fn() -> Option<V> + Send + Sync,
{
    fn value(&self) -> Override<V> {
        (self.callback)().into()
    }

    fn changes(&self) -> Option<Signal> {
        self.changes.clone()
    }

    fn name(&self) -> &'static str {
        "dynamic"
    }
}
