//! Comment-preserving edits of a TOML store document.
//!
//! Uses `toml_edit` so that a hand-written store file keeps its comments,
//! ordering and formatting across writes. Both functions are pure; the file
//! I/O lives in [`FileStore`](crate::FileStore).

use toml_edit::{DocumentMut, Item, TomlError};

/// Patch a TOML document string, setting the top-level `key` to `value`.
///
/// Returns the modified document string.
pub fn set_in_document(content: &str, key: &str, value: &toml::Value) -> Result<String, TomlError> {
    let mut doc: DocumentMut = content.parse()?;
    let mut edit_value: toml_edit::Value = value.to_string().parse()?;

    // Keep the decor (spacing, trailing comment) of a value being replaced.
    match doc.get(key).and_then(Item::as_value) {
        Some(existing) => *edit_value.decor_mut() = existing.decor().clone(),
        None => edit_value.decor_mut().clear(),
    }
    doc[key] = Item::Value(edit_value);

    Ok(doc.to_string())
}

/// Patch a TOML document string, removing the top-level `key`.
///
/// Returns `None` when the key was not present.
pub fn remove_from_document(content: &str, key: &str) -> Result<Option<String>, TomlError> {
    let mut doc: DocumentMut = content.parse()?;
    Ok(doc.remove(key).map(|_| doc.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Value;

    #[test]
    fn set_existing_key() {
        let content = "port = 8080\nhost = \"localhost\"\n";
        let result = set_in_document(content, "port", &Value::Integer(3000)).unwrap();
        assert!(result.contains("port = 3000"));
        assert!(result.contains("host = \"localhost\""));
    }

    #[test]
    fn set_new_key_in_empty_document() {
        let result = set_in_document("", "new_onboarding", &Value::Boolean(true)).unwrap();
        assert_eq!(result.trim(), "new_onboarding = true");
    }

    #[test]
    fn set_quotes_unusual_keys() {
        let result = set_in_document("", "Design Chart Offset", &Value::Float(1.5)).unwrap();
        assert!(result.contains("\"Design Chart Offset\" = 1.5"));
        let table: toml::Table = result.parse().unwrap();
        assert_eq!(table["Design Chart Offset"], Value::Float(1.5));
    }

    #[test]
    fn set_array_value() {
        let value = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
        let result = set_in_document("", "chart", &value).unwrap();
        let table: toml::Table = result.parse().unwrap();
        assert_eq!(table["chart"], value);
    }

    #[test]
    fn preserves_comments() {
        let content = "# Local overrides\nport = 8080 # dev port\n# end\n";
        let result = set_in_document(content, "port", &Value::Integer(3000)).unwrap();
        assert!(result.contains("# Local overrides"));
        assert!(result.contains("port = 3000 # dev port"));
        assert!(result.contains("# end"));
    }

    #[test]
    fn string_values_are_escaped() {
        let value = Value::String("say \"hi\"".into());
        let result = set_in_document("", "greeting", &value).unwrap();
        let table: toml::Table = result.parse().unwrap();
        assert_eq!(table["greeting"], value);
    }

    #[test]
    fn remove_existing_key() {
        let content = "# keep me\na = 1\nb = 2\n";
        let result = remove_from_document(content, "a").unwrap().unwrap();
        assert!(!result.contains("a = 1"));
        assert!(result.contains("b = 2"));
    }

    #[test]
    fn remove_missing_key_is_none() {
        assert_eq!(remove_from_document("a = 1\n", "b").unwrap(), None);
    }

    #[test]
    fn invalid_document_errors() {
        assert!(set_in_document("a = ", "b", &Value::Integer(1)).is_err());
    }
}
