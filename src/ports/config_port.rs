//! Configuration access port.
//!
//! Values are raw strings; `domain::config_validation` types and
//! range-checks them.

pub trait ConfigPort {
    /// Trimmed value, or `None` when the section or key is absent.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Section names, sorted.
    fn sections(&self) -> Vec<String>;
    /// Key names in a section, sorted.
    fn keys(&self, section: &str) -> Vec<String>;
}
