use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("A config with id '{0}' is already registered")]
    DuplicateId(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to edit {path}: {source}")]
    Document {
        path: PathBuf,
        source: toml_edit::TomlError,
    },

    #[error("Stored value for '{key}' is not {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Invalid JSON for '{key}': {source}")]
    Json {
        key: String,
        source: serde_json::Error,
    },

    #[error("Unknown tweak: {0}")]
    UnknownTweak(String),

    #[error("Invalid value for tweak '{id}': {value}")]
    InvalidTweakValue { id: String, value: String },

    #[error("No store location could be resolved: no home or platform directory found")]
    NoStoreLocation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_id_formats() {
        let err = ConfigError::DuplicateId("secret_new_feature".into());
        assert!(err.to_string().contains("secret_new_feature"));
    }

    #[test]
    fn type_mismatch_names_key_and_type() {
        let err = ConfigError::TypeMismatch {
            key: "chart_offset".into(),
            expected: "a float",
        };
        let msg = err.to_string();
        assert!(msg.contains("chart_offset"));
        assert!(msg.contains("a float"));
    }

    #[test]
    fn invalid_tweak_value_formats() {
        let err = ConfigError::InvalidTweakValue {
            id: "Flags Beta Enabled".into(),
            value: "maybe".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Flags Beta Enabled"));
        assert!(msg.contains("maybe"));
    }
}
