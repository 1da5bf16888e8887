//! The value capability: which types may back a configuration.
//!
//! Eligibility is closed-world. A type is usable as a config value only when it
//! implements [`ConfigValue`], which is checked wherever a
//! [`ConfigDefinition`](crate::ConfigDefinition) is constructed. Primitives,
//! `String`, `Option<T>` and `Vec<T>` are covered here; enums and custom
//! structs opt in with an empty impl:
//!
//! ```
//! use configchain::ConfigValue;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! enum Variant { A, B }
//!
//! impl ConfigValue for Variant {}
//! ```

/// Marker for types that can be held by a configuration definition.
pub trait ConfigValue: Clone + Send + Sync + 'static {}

macro_rules! config_value {
    ($($ty:ty),* $(,)?) => {
        $(impl ConfigValue for $ty {})*
    };
}

config_value!(
    bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char, String,
);

impl<T: ConfigValue> ConfigValue for Option<T> {}
impl<T: ConfigValue> ConfigValue for Vec<T> {}
