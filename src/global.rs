//! A process-wide repository for applications that want one.
//!
//! Nothing in the crate depends on it. Libraries and tests should create
//! their own [`ConfigRepository`] and pass it around instead.

use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::repository::ConfigRepository;

static REPOSITORY: OnceLock<Mutex<ConfigRepository>> = OnceLock::new();

/// The shared repository, created empty on first use.
///
/// ```
/// use configchain::{ConfigDefinition, global};
///
/// let dark_mode = ConfigDefinition::new("global_doc_dark_mode", false).static_value(true);
/// global::repository().lock().add(&dark_mode).unwrap();
/// assert!(global::repository().lock().get(&dark_mode));
/// ```
pub fn repository() -> &'static Mutex<ConfigRepository> {
    REPOSITORY.get_or_init(|| Mutex::new(ConfigRepository::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ConfigDefinition;

    #[test]
    fn same_instance_every_call() {
        assert!(std::ptr::eq(repository(), repository()));
    }

    #[test]
    fn registrations_are_shared() {
        let def = ConfigDefinition::new("global_test_free_items", 3).static_value(5);
        repository().lock().add(&def).unwrap();
        assert!(repository().lock().contains("global_test_free_items"));
        assert_eq!(repository().lock().get(&def), 5);
    }
}
