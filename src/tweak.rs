//! Developer tweaks: named, runtime-editable overrides for debug builds.
//!
//! A [`TweakStore`] is a registry of [`TweakDefinition`]s keyed by
//! `"{category} {section} {name}"`. Each entry keeps its initial value for
//! display and an optional current override. Only a value explicitly
//! [`set`](TweakStore::set) overrides a configuration; [`reset`](TweakStore::reset)
//! clears it again.
//!
//! Values are stored type-erased so one store can hold tweaks of any
//! [`Tweakable`] type. The [`Tweakable`] display codec lets tools that only
//! see strings (a debug menu, the `tweaks` CLI) show and edit them through
//! [`TweakStore::handle`].

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::error::ConfigError;
use crate::ops::{TweakEntry, TweakResult};
use crate::provider::Provider;
use crate::signal::Signal;
use crate::types::{Override, TweakAction};
use crate::value::ConfigValue;

/// Types a tweak can hold, with a round-trippable display form.
pub trait Tweakable: ConfigValue {
    fn to_display(&self) -> String;
    /// `None` when `text` is not a valid rendering of this type.
    fn from_display(text: &str) -> Option<Self>;
}

impl Tweakable for bool {
    fn to_display(&self) -> String {
        self.to_string()
    }

    fn from_display(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

macro_rules! tweakable_from_str {
    ($($ty:ty),*) => {
        $(
            impl Tweakable for $ty {
                fn to_display(&self) -> String {
                    self.to_string()
                }

                fn from_display(text: &str) -> Option<Self> {
                    text.trim().parse().ok()
                }
            }
        )*
    };
}

tweakable_from_str!(i32, i64, u32, f64);

impl Tweakable for String {
    fn to_display(&self) -> String {
        self.clone()
    }

    fn from_display(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

/// The empty string stands for `None`.
impl<T: Tweakable> Tweakable for Option<T> {
    fn to_display(&self) -> String {
        self.as_ref().map(Tweakable::to_display).unwrap_or_default()
    }

    fn from_display(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            Some(None)
        } else {
            T::from_display(text).map(Some)
        }
    }
}

/// Comma-separated elements.
impl<T: Tweakable> Tweakable for Vec<T> {
    fn to_display(&self) -> String {
        self.iter()
            .map(Tweakable::to_display)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn from_display(text: &str) -> Option<Self> {
        if text.trim().is_empty() {
            return Some(Vec::new());
        }
        text.split(',').map(T::from_display).collect()
    }
}

/// Registration metadata for one tweak.
#[derive(Debug, Clone, PartialEq)]
pub struct TweakDefinition<V> {
    id: String,
    category: String,
    section: String,
    name: String,
    initial: V,
}

impl<V> TweakDefinition<V> {
    pub fn new(category: &str, section: &str, name: &str, initial: V) -> Self {
        Self {
            id: format!("{category} {section} {name}"),
            category: category.to_string(),
            section: section.to_string(),
            name: name.to_string(),
            initial,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> &V {
        &self.initial
    }
}

type Erased = Box<dyn Any + Send + Sync>;

struct Entry {
    category: String,
    section: String,
    name: String,
    type_name: &'static str,
    initial: Erased,
    current: Option<Erased>,
    display: fn(&(dyn Any + Send + Sync)) -> String,
    parse: fn(&str) -> Option<Erased>,
}

impl Entry {
    fn snapshot(&self, id: &str) -> TweakEntry {
        TweakEntry {
            id: id.to_string(),
            category: self.category.clone(),
            section: self.section.clone(),
            name: self.name.clone(),
            initial: (self.display)(&*self.initial),
            current: self.current.as_deref().map(self.display),
        }
    }
}

fn display_erased<V: Tweakable>(value: &(dyn Any + Send + Sync)) -> String {
    value
        .downcast_ref::<V>()
        .map(Tweakable::to_display)
        .unwrap_or_default()
}

fn parse_erased<V: Tweakable>(text: &str) -> Option<Erased> {
    V::from_display(text).map(|v| Box::new(v) as Erased)
}

/// Registry of developer overrides.
#[derive(Default)]
pub struct TweakStore {
    entries: RwLock<BTreeMap<String, Entry>>,
    changes: Signal,
}

impl TweakStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` and return its id.
    ///
    /// Registering an id that already exists keeps the first registration,
    /// including any value already set on it.
    pub fn register<V: Tweakable>(&self, definition: TweakDefinition<V>) -> String {
        let TweakDefinition {
            id,
            category,
            section,
            name,
            initial,
        } = definition;

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&id) {
            if existing.type_name != type_name::<V>() {
                tracing::warn!(
                    tweak = %id,
                    registered = existing.type_name,
                    requested = type_name::<V>(),
                    "tweak already registered with another type; its provider will never override"
                );
            } else {
                tracing::debug!(tweak = %id, "tweak already registered");
            }
            return id;
        }
        tracing::debug!(tweak = %id, "registered tweak");
        entries.insert(
            id.clone(),
            Entry {
                category,
                section,
                name,
                type_name: type_name::<V>(),
                initial: Box::new(initial),
                current: None,
                display: display_erased::<V>,
                parse: parse_erased::<V>,
            },
        );
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    /// The value set on tweak `id`, if any. `None` as well when the tweak holds
    /// a different type than `V`.
    pub fn get<V: Tweakable>(&self, id: &str) -> Option<V> {
        self.entries
            .read()
            .get(id)?
            .current
            .as_ref()?
            .downcast_ref::<V>()
            .cloned()
    }

    pub fn set<V: Tweakable>(&self, id: &str, value: V) -> Result<(), ConfigError> {
        {
            let mut entries = self.entries.write();
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| ConfigError::UnknownTweak(id.to_string()))?;
            if !entry.initial.is::<V>() {
                return Err(ConfigError::TypeMismatch {
                    key: id.to_string(),
                    expected: entry.type_name,
                });
            }
            entry.current = Some(Box::new(value));
        }
        tracing::debug!(tweak = id, "tweak set");
        self.changes.emit();
        Ok(())
    }

    /// Set tweak `id` from its display form.
    pub fn set_display(&self, id: &str, text: &str) -> Result<(), ConfigError> {
        {
            let mut entries = self.entries.write();
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| ConfigError::UnknownTweak(id.to_string()))?;
            let parsed = (entry.parse)(text).ok_or_else(|| ConfigError::InvalidTweakValue {
                id: id.to_string(),
                value: text.to_string(),
            })?;
            entry.current = Some(parsed);
        }
        tracing::debug!(tweak = id, value = text, "tweak set");
        self.changes.emit();
        Ok(())
    }

    /// Clear the value set on `id`. Resetting an unset tweak still notifies.
    pub fn reset(&self, id: &str) -> Result<(), ConfigError> {
        {
            let mut entries = self.entries.write();
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| ConfigError::UnknownTweak(id.to_string()))?;
            entry.current = None;
        }
        tracing::debug!(tweak = id, "tweak reset");
        self.changes.emit();
        Ok(())
    }

    pub fn reset_all(&self) {
        for entry in self.entries.write().values_mut() {
            entry.current = None;
        }
        tracing::debug!("all tweaks reset");
        self.changes.emit();
    }

    /// Fires after every set or reset.
    pub fn changes(&self) -> Signal {
        self.changes.clone()
    }

    /// Display snapshots of every tweak, ordered by id.
    pub fn entries(&self) -> Vec<TweakEntry> {
        self.entries
            .read()
            .iter()
            .map(|(id, entry)| entry.snapshot(id))
            .collect()
    }

    pub fn entry(&self, id: &str) -> Result<TweakEntry, ConfigError> {
        self.entries
            .read()
            .get(id)
            .map(|entry| entry.snapshot(id))
            .ok_or_else(|| ConfigError::UnknownTweak(id.to_string()))
    }

    /// Execute a tweak operation and return the result for display.
    pub fn handle(&self, action: &TweakAction) -> Result<TweakResult, ConfigError> {
        match action {
            TweakAction::List => Ok(TweakResult::Listing {
                entries: self.entries(),
            }),
            TweakAction::Get { id } => Ok(TweakResult::Value(self.entry(id)?)),
            TweakAction::Set { id, value } => {
                self.set_display(id, value)?;
                Ok(TweakResult::ValueSet {
                    id: id.clone(),
                    value: value.clone(),
                })
            }
            TweakAction::Reset { id: Some(id) } => {
                self.reset(id)?;
                Ok(TweakResult::Reset { id: Some(id.clone()) })
            }
            TweakAction::Reset { id: None } => {
                self.reset_all();
                Ok(TweakResult::Reset { id: None })
            }
        }
    }
}

impl fmt::Debug for TweakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweakStore")
            .field("tweaks", &self.entries.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Overrides with the value set on one tweak.
pub struct TweakProvider<V> {
    id: String,
    tweaks: Weak<TweakStore>,
    changes: Signal,
    _phantom: std::marker::PhantomData<fn() -> V>,
}

impl<V> TweakProvider<V> {
    pub fn new(tweaks: &Arc<TweakStore>, id: String) -> Self {
        Self {
            id,
            tweaks: Arc::downgrade(tweaks),
            changes: tweaks.changes(),
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<V: Tweakable> Provider<V> for TweakProvider<V> {
    fn value(&self) -> Override<V> {
        self.tweaks
            .upgrade()
            .and_then(|tweaks| tweaks.get::<V>(&self.id))
            .into()
    }

    fn changes(&self) -> Option<Signal> {
        Some(self.changes.clone())
    }

    fn name(&self) -> &'static str {
        "tweak"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store_with_flag() -> (Arc<TweakStore>, String) {
        let tweaks = Arc::new(TweakStore::new());
        let id = tweaks.register(TweakDefinition::new("Features", "Onboarding", "New flow", false));
        (tweaks, id)
    }

    #[test]
    fn id_joins_category_section_name() {
        let def = TweakDefinition::new("Design", "Chart", "Offset", 0.0);
        assert_eq!(def.id(), "Design Chart Offset");
        assert_eq!(def.section(), "Chart");
    }

    #[test]
    fn unset_tweak_has_no_opinion() {
        let (tweaks, id) = store_with_flag();
        let provider = TweakProvider::<bool>::new(&tweaks, id);
        assert_eq!(provider.value(), Override::NoOverride);
    }

    #[test]
    fn set_then_reset() {
        let (tweaks, id) = store_with_flag();
        let provider = TweakProvider::<bool>::new(&tweaks, id.clone());

        tweaks.set(&id, true).unwrap();
        assert_eq!(provider.value(), Override::Override(true));

        tweaks.reset(&id).unwrap();
        assert_eq!(provider.value(), Override::NoOverride);
    }

    #[test]
    fn set_rejects_wrong_type() {
        let (tweaks, id) = store_with_flag();
        let err = tweaks.set(&id, 3i64).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { expected: "bool", .. }));
        assert_eq!(tweaks.get::<bool>(&id), None);
    }

    #[test]
    fn unknown_tweak_errors() {
        let tweaks = TweakStore::new();
        assert!(matches!(tweaks.set("nope", true), Err(ConfigError::UnknownTweak(_))));
        assert!(matches!(tweaks.reset("nope"), Err(ConfigError::UnknownTweak(_))));
    }

    #[test]
    fn second_registration_keeps_first() {
        let (tweaks, id) = store_with_flag();
        tweaks.set(&id, true).unwrap();
        let again = tweaks.register(TweakDefinition::new("Features", "Onboarding", "New flow", false));

        assert_eq!(again, id);
        assert_eq!(tweaks.get::<bool>(&id), Some(true));
        assert_eq!(tweaks.entries().len(), 1);
    }

    #[test]
    fn registration_with_another_type_keeps_first_type() {
        let (tweaks, id) = store_with_flag();
        let again = tweaks.register(TweakDefinition::new(
            "Features",
            "Onboarding",
            "New flow",
            "on".to_string(),
        ));
        assert_eq!(again, id);

        let as_text = TweakProvider::<String>::new(&tweaks, id.clone());
        assert!(matches!(
            tweaks.set(&id, "off".to_string()),
            Err(ConfigError::TypeMismatch { expected: "bool", .. })
        ));
        tweaks.set(&id, true).unwrap();
        assert_eq!(as_text.value(), Override::NoOverride);
    }

    #[test]
    fn writes_emit() {
        let (tweaks, id) = store_with_flag();
        let events = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&events);
        let _sub = tweaks.changes().subscribe(move || {
            e.fetch_add(1, Ordering::SeqCst);
        });

        tweaks.set(&id, true).unwrap();
        tweaks.set_display(&id, "off").unwrap();
        tweaks.reset_all();
        assert_eq!(events.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn display_codec() {
        assert_eq!(Some(1.5).to_display(), "1.5");
        assert_eq!(None::<i64>.to_display(), "");
        assert_eq!(Option::<i64>::from_display(""), Some(None));
        assert_eq!(Vec::<i32>::from_display("1, 2,3"), Some(vec![1, 2, 3]));
        assert_eq!(vec![1i32, 2].to_display(), "1, 2");
        assert_eq!(bool::from_display("maybe"), None);
        assert_eq!(Vec::<i32>::from_display("1, x"), None);
    }

    #[test]
    fn handle_set_parses_display_form() {
        let (tweaks, id) = store_with_flag();
        let result = tweaks
            .handle(&TweakAction::Set {
                id: id.clone(),
                value: "yes".into(),
            })
            .unwrap();

        assert_eq!(format!("{result}"), "Set Features Onboarding New flow = yes");
        assert_eq!(tweaks.get::<bool>(&id), Some(true));
    }

    #[test]
    fn handle_set_rejects_unparsable_value() {
        let (tweaks, id) = store_with_flag();
        let err = tweaks
            .handle(&TweakAction::Set {
                id,
                value: "sometimes".into(),
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTweakValue { .. }));
    }

    #[test]
    fn handle_get_and_list() {
        let (tweaks, id) = store_with_flag();
        tweaks.register(TweakDefinition::new("Design", "Chart", "Offset", Some(20.0)));
        tweaks.set(&id, true).unwrap();

        match tweaks.handle(&TweakAction::Get { id: id.clone() }).unwrap() {
            TweakResult::Value(entry) => {
                assert_eq!(entry.initial, "false");
                assert_eq!(entry.current.as_deref(), Some("true"));
            }
            other => panic!("Expected Value, got {other:?}"),
        }

        match tweaks.handle(&TweakAction::List).unwrap() {
            TweakResult::Listing { entries } => {
                let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
                assert_eq!(ids, vec!["Design Chart Offset", "Features Onboarding New flow"]);
            }
            other => panic!("Expected Listing, got {other:?}"),
        }
    }

    #[test]
    fn handle_reset_all() {
        let (tweaks, id) = store_with_flag();
        tweaks.set(&id, true).unwrap();
        let result = tweaks.handle(&TweakAction::Reset { id: None }).unwrap();

        assert_eq!(result, TweakResult::Reset { id: None });
        assert_eq!(tweaks.get::<bool>(&id), None);
    }

    #[test]
    fn dropped_store_means_no_override() {
        let (tweaks, id) = store_with_flag();
        tweaks.set(&id, true).unwrap();
        let provider = TweakProvider::<bool>::new(&tweaks, id);

        drop(tweaks);
        assert_eq!(provider.value(), Override::NoOverride);
    }
}
