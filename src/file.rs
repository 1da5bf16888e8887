//! A persisted store backed by one TOML file.
//!
//! # Location
//!
//! [`resolve_location`] turns a [`StoreLocation`] into a directory:
//!
//! - `Platform`: the platform config directory for `app_name`
//!   (e.g. `~/.config/{app_name}/` on Linux).
//! - `Home(subdir)`: `~/{subdir}`.
//! - `Cwd`: the current working directory.
//! - `Path(dir)`: the given directory.
//!
//! # Reads and writes
//!
//! Values live as top-level keys of the file. Reads are served from a parsed
//! copy loaded on first access; [`FileStore::reload`] picks up edits made by
//! other processes. Writes re-read the file, patch it with `toml_edit` so
//! comments survive, and replace it atomically (write a temp file in the same
//! directory, then rename it over the original). A missing file reads as
//! empty and is created on first write, along with its parent directories.

use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use toml::{Table, Value};

use crate::error::ConfigError;
use crate::persist::{remove_from_document, set_in_document};
use crate::signal::Signal;
use crate::store::KeyValueStore;
use crate::types::StoreLocation;

/// Resolve a [`StoreLocation`] to a concrete directory.
///
/// Returns `None` if the location cannot be resolved (e.g. no home directory found).
pub fn resolve_location(location: &StoreLocation, app_name: &str) -> Option<PathBuf> {
    match location {
        StoreLocation::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        StoreLocation::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        StoreLocation::Cwd => std::env::current_dir().ok(),
        StoreLocation::Path(p) => Some(p.clone()),
    }
}

pub struct FileStore {
    path: PathBuf,
    /// Parsed file contents; `None` until first read or after `reload`.
    /// Writers hold this lock across read-modify-write.
    cache: Mutex<Option<Table>>,
    changes: Signal,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
            changes: Signal::new(),
        }
    }

    /// A store at `{location}/{file_name}`.
    pub fn at(location: &StoreLocation, app_name: &str, file_name: &str) -> Result<Self, ConfigError> {
        resolve_location(location, app_name)
            .map(|dir| Self::new(dir.join(file_name)))
            .ok_or(ConfigError::NoStoreLocation)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored value.
    pub fn load(&self) -> Result<Table, ConfigError> {
        let mut cache = self.cache.lock();
        self.cached(&mut cache).cloned()
    }

    /// Drop the cached contents and notify listeners, so the next read sees
    /// the file as it is now.
    pub fn reload(&self) {
        *self.cache.lock() = None;
        tracing::debug!(path = %self.path.display(), "store file reloaded");
        self.changes.emit();
    }

    fn cached<'a>(&self, cache: &'a mut Option<Table>) -> Result<&'a Table, ConfigError> {
        if cache.is_none() {
            let table = match self.read_content()? {
                Some(content) => parse_table(&self.path, &content)?,
                None => Table::new(),
            };
            *cache = Some(table);
        }
        Ok(cache.get_or_insert_with(Table::new))
    }

    fn read_content(&self) -> Result<Option<String>, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(c) => Ok(Some(c)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::Io {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn write_content(&self, content: &str) -> Result<(), ConfigError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let io_err = |source: std::io::Error| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(content.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Apply `edit` to the current file text and commit the result.
    fn edit<F>(&self, key: &str, edit: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&str) -> Result<Option<String>, toml_edit::TomlError>,
    {
        {
            let mut cache = self.cache.lock();
            let content = self.read_content()?.unwrap_or_default();
            let Some(updated) = edit(&content).map_err(|source| ConfigError::Document {
                path: self.path.clone(),
                source,
            })?
            else {
                return Ok(());
            };
            let table = parse_table(&self.path, &updated)?;
            self.write_content(&updated)?;
            *cache = Some(table);
        }
        tracing::debug!(path = %self.path.display(), key, "store file updated");
        self.changes.emit();
        Ok(())
    }
}

fn parse_table(path: &Path, content: &str) -> Result<Table, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        let mut cache = self.cache.lock();
        Ok(self.cached(&mut cache)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        self.edit(key, |content| set_in_document(content, key, &value).map(Some))
    }

    /// Removing a key the file does not hold leaves the file untouched and
    /// does not notify.
    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        self.edit(key, |content| remove_from_document(content, key))
    }

    fn changes(&self) -> Signal {
        self.changes.clone()
    }
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}
