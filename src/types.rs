use std::path::PathBuf;

/// The answer a provider gives when asked for a value.
///
/// There is deliberately no default: a provider must say either that it has
/// no opinion or which value it wants. `Override(v)` where `v` equals the
/// definition's default still counts as an override and stops resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override<V> {
    /// The provider has no opinion; resolution continues with the next provider.
    NoOverride,
    /// The provider supplies this value.
    Override(V),
}

impl<V> Override<V> {
    pub fn is_override(&self) -> bool {
        matches!(self, Override::Override(_))
    }

    pub fn into_option(self) -> Option<V> {
        match self {
            Override::Override(v) => Some(v),
            Override::NoOverride => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Override<U> {
        match self {
            Override::Override(v) => Override::Override(f(v)),
            Override::NoOverride => Override::NoOverride,
        }
    }
}

impl<V> From<Option<V>> for Override<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(v) => Override::Override(v),
            None => Override::NoOverride,
        }
    }
}

/// Where a [`FileStore`](crate::FileStore) keeps its file.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLocation {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// A tweak operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum TweakAction {
    List,
    Get { id: String },
    Set { id: String, value: String },
    Reset { id: Option<String> },
}
