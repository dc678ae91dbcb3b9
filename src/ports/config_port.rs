//! Configuration access port trait.

/// Raw key lookup. Typing and validation happen in
/// [`load_settings`](crate::domain::config_validation::load_settings).
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
