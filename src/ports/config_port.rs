//! Configuration access port trait.

/// Raw key lookup. Typed parsing and validation live in
/// [`crate::domain::config_builder`].
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
