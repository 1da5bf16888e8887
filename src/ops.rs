//! Tweak operation results.
//!
//! [`TweakStore::handle`](crate::TweakStore::handle) returns a [`TweakResult`]
//! for the caller to print. Values appear in their `Tweakable` display form.

use std::fmt;

/// Display snapshot of one registered tweak.
#[derive(Debug, Clone, PartialEq)]
pub struct TweakEntry {
    pub id: String,
    pub category: String,
    pub section: String,
    pub name: String,
    pub initial: String,
    /// The value set on the tweak, `None` while it follows the configuration.
    pub current: Option<String>,
}

/// Result of a tweak operation. Returned to the caller for display.
#[derive(Debug, Clone, PartialEq)]
pub enum TweakResult {
    /// Every registered tweak, ordered by id.
    Listing { entries: Vec<TweakEntry> },
    /// One tweak's initial and current value.
    Value(TweakEntry),
    /// Confirmation that a value was set.
    ValueSet { id: String, value: String },
    /// Confirmation that one tweak (`Some`) or all of them (`None`) were reset.
    Reset { id: Option<String> },
}

impl fmt::Display for TweakEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.current {
            Some(current) => write!(f, "{} = {current} (initial: {})", self.id, self.initial),
            None => write!(f, "{} = {} <not set>", self.id, self.initial),
        }
    }
}

impl fmt::Display for TweakResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TweakResult::Listing { entries } => {
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{entry}")?;
                }
                Ok(())
            }
            TweakResult::Value(entry) => write!(f, "{entry}"),
            TweakResult::ValueSet { id, value } => write!(f, "Set {id} = {value}"),
            TweakResult::Reset { id: Some(id) } => write!(f, "Reset {id}"),
            TweakResult::Reset { id: None } => write!(f, "Reset all tweaks"),
        }
    }
}
