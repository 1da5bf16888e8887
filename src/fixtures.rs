#[cfg(test)]
pub mod test {
    use std::fmt;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};
    use toml::Value;

    use crate::error::ConfigError;
    use crate::provider::Provider;
    use crate::signal::Signal;
    use crate::store::KeyValueStore;
    use crate::types::Override;
    use crate::value::ConfigValue;

    // -- Providers -------------------------------------------------------------

    /// Returns a fixed answer and counts how often it was asked.
    /// Clones share the counter.
    #[derive(Clone)]
    pub struct CountingProvider<V> {
        answer: Option<V>,
        calls: Arc<AtomicUsize>,
    }

    impl<V> CountingProvider<V> {
        pub fn new(answer: Option<V>) -> Self {
            Self {
                answer,
                calls: Arc::default(),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl<V: Clone + Send + Sync> Provider<V> for CountingProvider<V> {
        fn value(&self) -> Override<V> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().into()
        }
    }

    /// A provider whose answer the test changes by hand. `set` stores the new
    /// answer and emits. Clones share state.
    #[derive(Clone)]
    pub struct ManualProvider<V> {
        answer: Arc<Mutex<Option<V>>>,
        signal: Signal,
    }

    impl<V> ManualProvider<V> {
        pub fn new(answer: Option<V>) -> Self {
            Self {
                answer: Arc::new(Mutex::new(answer)),
                signal: Signal::new(),
            }
        }

        pub fn set(&self, answer: Option<V>) {
            *self.answer.lock() = answer;
            self.signal.emit();
        }

        pub fn signal(&self) -> Signal {
            self.signal.clone()
        }
    }

    impl<V: Clone + Send + Sync> Provider<V> for ManualProvider<V> {
        fn value(&self) -> Override<V> {
            self.answer.lock().clone().into()
        }

        fn changes(&self) -> Option<Signal> {
            Some(self.signal.clone())
        }
    }

    #[test]
    fn manual_provider_shares_state_between_clones() {
        let a = ManualProvider::new(None);
        let b = a.clone();
        a.set(Some(2));
        assert_eq!(b.value(), Override::Override(2));
        assert!(a.signal().same_as(&b.signal()));
    }

    #[test]
    fn provider_default_name_is_short_type_name() {
        assert_eq!(CountingProvider::new(Some(1)).name(), "CountingProvider");
    }

    // -- Stores ----------------------------------------------------------------

    /// A store whose reads always fail.
    #[derive(Default)]
    pub struct FailingStore {
        changes: Signal,
    }

    impl KeyValueStore for FailingStore {
        fn get(&self, key: &str) -> Result<Option<Value>, ConfigError> {
            Err(ConfigError::TypeMismatch {
                key: key.to_string(),
                expected: "a readable value",
            })
        }

        fn set(&self, _key: &str, _value: Value) -> Result<(), ConfigError> {
            Ok(())
        }

        fn remove(&self, _key: &str) -> Result<(), ConfigError> {
            Ok(())
        }

        fn changes(&self) -> Signal {
            self.changes.clone()
        }
    }

    // -- Values ----------------------------------------------------------------

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct Layout {
        pub columns: u32,
        pub compact: bool,
    }

    impl ConfigValue for Layout {}

    /// An A/B experiment arm.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Variant {
        A,
        B,
    }

    impl ConfigValue for Variant {}

    impl fmt::Display for Variant {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Variant::A => f.write_str("a"),
                Variant::B => f.write_str("b"),
            }
        }
    }

    impl FromStr for Variant {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "a" => Ok(Variant::A),
                "b" => Ok(Variant::B),
                other => Err(format!("unknown variant '{other}'")),
            }
        }
    }
}
