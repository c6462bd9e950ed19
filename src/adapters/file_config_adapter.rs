//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive (configparser lowercases them).
//! Keys without a value (`key =` or a bare `key`) read as absent.

use crate::domain::error::SignalError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;
use tracing::debug;

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SignalError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| SignalError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        debug!(file = %path.display(), sections = ini.sections().len(), "loaded config");
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, SignalError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| SignalError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { ini })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.ini.sections();
        sections.sort();
        sections
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .ini
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, v)| v.as_deref().is_some_and(|v| !v.trim().is_empty()))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();
        keys.sort();
        keys
    }
}
