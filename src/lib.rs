//! Typed configuration values with layered overrides. Declare a default, stack
//! value sources on top, and read one effective value.
//!
//! A configchain definition is a compiled default plus an ordered list of
//! providers: a persisted local override, a remote-config parameter, a
//! conditional rule, a developer tweak, an environment variable. At read time
//! exactly one value wins, and observers are told when that value may have
//! changed.
//!
//! ```
//! use configchain::{Condition, ConfigDefinition, ConfigRepository, MemoryStore, StoreKey};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let internal_build = Condition::new(|| true);
//!
//! let new_onboarding = ConfigDefinition::new("new_onboarding", false)
//!     .when(internal_build, true)
//!     .persisted(&store, StoreKey::new("new_onboarding"));
//!
//! let mut repo = ConfigRepository::new();
//! repo.add(&new_onboarding)?;
//! assert!(repo.is_on(&new_onboarding));
//! # Ok::<(), configchain::ConfigError>(())
//! ```
//!
//! # Why configchain
//!
//! Apps grow configuration from many places at once: a product default, a
//! value the backend can flip remotely, a rule for tablets, a switch a QA
//! engineer toggles from a debug menu, a user preference saved on disk. Wired
//! by hand, every call site ends up with its own `if` ladder and its own idea
//! of which source wins.
//!
//! Configchain replaces the ladder with a declaration. The definition says
//! which sources exist and in which order; every read and every change
//! notification derives from that one declaration.
//!
//! # Precedence: last attached wins
//!
//! ```text
//! Default              ConfigDefinition::new(id, default)
//!        ↑ overridden by
//! First provider       .remote_config(..)
//!        ↑ overridden by
//! ...                  .when(..)
//!        ↑ overridden by
//! Last provider        .persisted(..)
//! ```
//!
//! Resolution walks the providers from the last attached to the first and
//! stops at the first one that answers [`Override::Override`]. Providers that
//! answer [`Override::NoOverride`] are skipped; if all of them do, the default
//! is returned. The order is the attachment order and nothing else: a
//! persisted value attached after a condition beats the condition even while
//! the condition holds.
//!
//! Providers are **sparse**: each only has an opinion when it has one. An
//! empty store, an unset tweak, a missing remote parameter or a false
//! condition all fall through.
//!
//! # Definitions are values
//!
//! Every attach operation returns a new [`ConfigDefinition`] and leaves the
//! receiver alone, so a shared prefix can be extended in several directions.
//! Definitions are `Clone + Send + Sync` and cheap to clone.
//!
//! # Providers
//!
//! | Attach | Provider | Overrides with |
//! |--------|----------|----------------|
//! | [`static_value`](ConfigDefinition::static_value) | [`StaticProvider`] | a fixed value |
//! | [`dynamic`](ConfigDefinition::dynamic) | [`DynamicProvider`] | a callback's answer |
//! | [`when`](ConfigDefinition::when) | [`ConditionalProvider`] | a value while a [`Condition`] holds |
//! | [`persisted`](ConfigDefinition::persisted) | [`StoreProvider`] | a [`KeyValueStore`] slot |
//! | [`remote_config`](ConfigDefinition::remote_config) | [`RemoteProvider`] | an activated [`RemoteConfig`] value |
//! | [`tweak`](ConfigDefinition::tweak) | [`TweakProvider`] | a value set in a [`TweakStore`] |
//! | [`env_var`](ConfigDefinition::env_var) | [`EnvProvider`] | a parsed environment variable |
//!
//! Anything else implements [`Provider`] and is attached with
//! [`with_provider`](ConfigDefinition::with_provider).
//!
//! Which value types a source supports is a trait bound checked at compile
//! time: [`Storable`] for stores and environment variables,
//! [`RemoteConfigurable`] (booleans, integers, strings) for remote config,
//! [`Tweakable`] for tweaks.
//!
//! Providers never fail resolution. A store read error, an undecodable value
//! or a dropped backing system is logged with `tracing` and treated as "no
//! opinion".
//!
//! # Change notification
//!
//! Providers backed by mutable state expose a [`Signal`]. A definition merges
//! the signals of all its providers; a [`ConfigRepository`] merges the
//! signals of all registered definitions into
//! [`changes`](ConfigRepository::changes). Typed observers use
//! [`listen`](ConfigRepository::listen) or [`watch`](ConfigRepository::watch),
//! which re-resolve on each signal and drop consecutive duplicates. Signals
//! carry no payload: they only say "re-resolve".
//!
//! # Stores
//!
//! The crate does not own persistence. [`MemoryStore`] keeps values in
//! process; [`FileStore`] keeps them as top-level keys of a TOML file at a
//! [`StoreLocation`], editing with `toml_edit` so comments survive. How a
//! type is laid out in a store is a [`StorageMechanism`]: the [`Storable`]
//! default, JSON text, or `FromStr`/`Display` text.
//!
//! # Tweaks
//!
//! A [`TweakStore`] holds developer overrides registered by
//! [`tweak`](ConfigDefinition::tweak) under `"{category} {section} {name}"`.
//! [`TweakStore::handle`] executes a [`TweakAction`] (list, get, set, reset)
//! and returns a printable [`TweakResult`]; with the `clap` feature (on by
//! default) [`TweakArgs`] turns command-line arguments into that action. To
//! use configchain without clap:
//!
//! ```toml
//! configchain = { version = "...", default-features = false }
//! ```
//!
//! # Error handling
//!
//! Fallible operations return [`ConfigError`]: duplicate registration, store
//! I/O and parse failures, type mismatches and unknown tweaks. Absence of an
//! override is never an error. See the [`error`] module for the full set.

pub mod error;
pub mod global;
pub mod types;

#[cfg(feature = "clap")]
mod cli;
mod condition;
mod definition;
mod env;
mod file;
mod ops;
mod persist;
mod provider;
mod remote;
mod repository;
mod signal;
mod store;
mod tweak;
mod value;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use cli::{TweakArgs, TweakSubcommand};
pub use condition::{BuildChannel, Condition, ConditionalProvider, DeviceClass, DeviceClasses};
pub use definition::{AnyDefinition, ConfigDefinition};
pub use env::EnvProvider;
pub use error::ConfigError;
pub use file::{FileStore, resolve_location};
pub use ops::{TweakEntry, TweakResult};
pub use provider::{DynamicProvider, Provider, StaticProvider};
pub use remote::{RemoteConfig, RemoteConfigurable, RemoteKey, RemoteProvider, RemoteValues};
pub use repository::{ConfigRepository, ListenerId};
pub use signal::{ChangeCallback, Signal, Subscription};
pub use store::{
    KeyValueStore, MemoryStore, Storable, StorageMechanism, StoreKey, StoreProvider, TypedStore,
};
pub use tweak::{TweakDefinition, TweakProvider, TweakStore, Tweakable};
pub use types::{Override, StoreLocation, TweakAction};
pub use value::ConfigValue;
