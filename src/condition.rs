//! Boolean predicates and the conditional provider.
//!
//! A [`Condition`] is an opaque, synchronous `Fn() -> bool`. The resolution
//! engine never looks inside it. The constructors below only cover common
//! shapes (device class, build channel, internal user); the probe that reads
//! the actual device or user is always supplied by the embedding application.

use std::fmt;
use std::ops::{BitOr, BitOrAssign, Not};
use std::sync::Arc;

use crate::provider::Provider;
use crate::types::Override;

#[derive(Clone)]
pub struct Condition {
    predicate: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Condition {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    pub fn always() -> Self {
        Self::new(|| true)
    }

    pub fn never() -> Self {
        Self::new(|| false)
    }

    pub fn is_enabled(&self) -> bool {
        (self.predicate)()
    }

    /// Short-circuits: `other` is not evaluated when `self` is false.
    pub fn and(self, other: Condition) -> Self {
        Self::new(move || self.is_enabled() && other.is_enabled())
    }

    /// Short-circuits: `other` is not evaluated when `self` is true.
    pub fn or(self, other: Condition) -> Self {
        Self::new(move || self.is_enabled() || other.is_enabled())
    }

    pub fn any_of(conditions: impl IntoIterator<Item = Condition>) -> Self {
        let all: Vec<Condition> = conditions.into_iter().collect();
        Self::new(move || all.iter().any(Condition::is_enabled))
    }

    pub fn all_of(conditions: impl IntoIterator<Item = Condition>) -> Self {
        let all: Vec<Condition> = conditions.into_iter().collect();
        Self::new(move || all.iter().all(Condition::is_enabled))
    }

    /// True when the class reported by `probe` is in `classes`.
    pub fn device_class<F>(classes: DeviceClasses, probe: F) -> Self
    where
        F: Fn() -> DeviceClass + Send + Sync + 'static,
    {
        Self::new(move || classes.contains(probe()))
    }

    /// True when the channel reported by `probe` is one of `channels`.
    pub fn build_channel<F>(channels: &[BuildChannel], probe: F) -> Self
    where
        F: Fn() -> BuildChannel + Send + Sync + 'static,
    {
        let channels = channels.to_vec();
        Self::new(move || channels.contains(&probe()))
    }

    /// True when the signed-in user's email (from `probe`) ends with `suffix`.
    /// A signed-out user (`None`) never matches.
    pub fn user_email_suffix<F>(suffix: impl Into<String>, probe: F) -> Self
    where
        F: Fn() -> Option<String> + Send + Sync + 'static,
    {
        let suffix = suffix.into();
        Self::new(move || probe().is_some_and(|email| email.ends_with(&suffix)))
    }
}

impl<F> From<F> for Condition
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn from(predicate: F) -> Self {
        Condition::new(predicate)
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition::new(move || !self.is_enabled())
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    Phone,
    Tablet,
    Tv,
    Desktop,
}

impl DeviceClass {
    fn bit(self) -> u8 {
        match self {
            DeviceClass::Phone => 1 << 0,
            DeviceClass::Tablet => 1 << 1,
            DeviceClass::Tv => 1 << 2,
            DeviceClass::Desktop => 1 << 3,
        }
    }
}

/// A set of [`DeviceClass`]es, combinable with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceClasses(u8);

impl DeviceClasses {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn contains(self, class: DeviceClass) -> bool {
        self.0 & class.bit() != 0
    }
}

impl From<DeviceClass> for DeviceClasses {
    fn from(class: DeviceClass) -> Self {
        Self(class.bit())
    }
}

impl BitOr for DeviceClass {
    type Output = DeviceClasses;

    fn bitor(self, rhs: DeviceClass) -> DeviceClasses {
        DeviceClasses(self.bit() | rhs.bit())
    }
}

impl BitOr<DeviceClass> for DeviceClasses {
    type Output = DeviceClasses;

    fn bitor(self, rhs: DeviceClass) -> DeviceClasses {
        DeviceClasses(self.0 | rhs.bit())
    }
}

impl BitOrAssign<DeviceClass> for DeviceClasses {
    fn bitor_assign(&mut self, rhs: DeviceClass) {
        self.0 |= rhs.bit();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildChannel {
    Debug,
    Internal,
    Production,
}

/// Overrides with `value()` while the condition holds.
///
/// `value` is only called when the condition is true, so an expensive fallback
/// costs nothing unless it is selected.
pub struct ConditionalProvider<F> {
    condition: Condition,
    value: F,
}

impl<F> ConditionalProvider<F> {
    pub fn new(condition: Condition, value: F) -> Self {
        Self { condition, value }
    }
}

impl<V, F> Provider<V> for ConditionalProvider<F>
where
    F: Fn() -> V + Send + Sync,
{
    fn value(&self) -> Override<V> {
        if self.condition.is_enabled() {
            Override::Override((self.value)())
        } else {
            Override::NoOverride
        }
    }

    fn name(&self) -> &'static str {
        "conditional"
    }
}
