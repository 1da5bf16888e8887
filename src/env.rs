use std::marker::PhantomData;
use std::sync::Arc;

use toml::Value;

use crate::provider::Provider;
use crate::store::Storable;
use crate::types::Override;

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Overrides with the parsed contents of one environment variable.
///
/// Unset variables mean no override. The text is read on every resolution;
/// there is no change signal because the process environment has no
/// notification mechanism.
pub struct EnvProvider<V> {
    name: String,
    lookup: Lookup,
    _phantom: PhantomData<fn() -> V>,
}

impl<V> EnvProvider<V> {
    pub fn new(name: &str) -> Self {
        Self::with_lookup(name, |var| std::env::var(var).ok())
    }

    /// Takes a lookup function so tests can pass synthetic data instead of
    /// the real environment.
    pub fn with_lookup<F>(name: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            lookup: Arc::new(lookup),
            _phantom: PhantomData,
        }
    }
}

impl<V: Storable> Provider<V> for EnvProvider<V> {
    fn value(&self) -> Override<V> {
        let Some(raw) = (self.lookup)(&self.name) else {
            return Override::NoOverride;
        };
        match V::decode(&self.name, parse_env_value(&raw)) {
            Ok(value) => Override::Override(value),
            // "123" parses as an integer, but may be meant for a string config.
            Err(_) if !raw.is_empty() => match V::decode(&self.name, Value::String(raw)) {
                Ok(value) => Override::Override(value),
                Err(e) => {
                    tracing::warn!(var = %self.name, error = %e, "ignoring environment override");
                    Override::NoOverride
                }
            },
            Err(e) => {
                tracing::warn!(var = %self.name, error = %e, "ignoring environment override");
                Override::NoOverride
            }
        }
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

/// Parse an env var value into a typed TOML value.
/// Tries: bool → integer → float → array/inline table → string.
pub fn parse_env_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        // Only use float if the string actually contains a dot,
        // to avoid "NaN" / "inf" being parsed as float.
        if s.contains('.') {
            return Value::Float(f);
        }
    }
    let trimmed = s.trim_start();
    if (trimmed.starts_with('[') || trimmed.starts_with('{'))
        && let Ok(mut table) = format!("v = {s}").parse::<toml::Table>()
        && let Some(value) = table.remove("v")
    {
        return value;
    }
    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider<V>(value: Option<&'static str>) -> EnvProvider<V> {
        EnvProvider::with_lookup("MYAPP_SETTING", move |name| {
            assert_eq!(name, "MYAPP_SETTING");
            value.map(str::to_string)
        })
    }

    #[test]
    fn unset_variable_has_no_opinion() {
        assert_eq!(provider::<bool>(None).value(), Override::NoOverride);
    }

    #[test]
    fn parse_bool_case_insensitive() {
        assert_eq!(provider::<bool>(Some("TRUE")).value(), Override::Override(true));
        assert_eq!(provider::<bool>(Some("false")).value(), Override::Override(false));
    }

    #[test]
    fn parse_integer() {
        assert_eq!(provider::<i64>(Some("-5")).value(), Override::Override(-5));
    }

    #[test]
    fn parse_float() {
        assert_eq!(provider::<f64>(Some("1.5")).value(), Override::Override(1.5));
    }

    #[test]
    fn numeric_text_still_works_for_strings() {
        assert_eq!(
            provider::<String>(Some("8080")).value(),
            Override::Override("8080".to_string())
        );
    }

    #[test]
    fn parse_array() {
        assert_eq!(
            provider::<Vec<i32>>(Some("[1, 2, 3]")).value(),
            Override::Override(vec![1, 2, 3])
        );
    }

    #[test]
    fn unparsable_value_has_no_opinion() {
        assert_eq!(provider::<bool>(Some("maybe")).value(), Override::NoOverride);
        assert_eq!(provider::<u8>(Some("300")).value(), Override::NoOverride);
    }

    #[test]
    fn string_fallback() {
        assert_eq!(
            parse_env_value("hello world"),
            Value::String("hello world".into())
        );
        assert_eq!(parse_env_value("[unclosed"), Value::String("[unclosed".into()));
    }

    #[test]
    fn nan_is_not_a_float() {
        assert_eq!(parse_env_value("NaN"), Value::String("NaN".into()));
    }
}
