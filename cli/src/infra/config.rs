//! Infrastructure implementation of the `SettingsSource` port.

use anyhow::Result;
use std::path::PathBuf;

use crate::application::ports::SettingsSource;
use crate::domain::config::Settings;
use crate::domain::error::ConfigError;

/// Environment variable overriding the settings file location.
pub const SETTINGS_ENV: &str = "FOREMAN_ENC_SETTINGS";

/// Production implementation of `SettingsSource` that reads `foreman.yaml`.
#[derive(Debug, Default)]
pub struct YamlSettingsSource {
    explicit: Option<PathBuf>,
}

impl YamlSettingsSource {
    /// `explicit` takes precedence over the environment and the OS default.
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }
}

impl SettingsSource for YamlSettingsSource {
    fn load(&self) -> Result<Settings> {
        let path = self.path();
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Unreadable {
            path: path.clone(),
            source,
        })?;
        let threads = std::thread::available_parallelism().map_or(1, usize::from);
        Ok(Settings::from_yaml(&content, &path, threads)?)
    }

    fn path(&self) -> PathBuf {
        if let Some(path) = &self.explicit {
            return path.clone();
        }
        if let Ok(val) = std::env::var(SETTINGS_ENV) {
            return PathBuf::from(val);
        }
        default_path()
    }
}

#[cfg(any(target_os = "freebsd", target_os = "dragonfly"))]
fn default_path() -> PathBuf {
    PathBuf::from("/usr/local/etc/puppet/foreman.yaml")
}

#[cfg(not(any(target_os = "freebsd", target_os = "dragonfly")))]
fn default_path() -> PathBuf {
    let aio = std::path::Path::new("/etc/puppetlabs/puppet/foreman.yaml");
    if aio.exists() {
        aio.to_path_buf()
    } else {
        PathBuf::from("/etc/puppet/foreman.yaml")
    }
}
