//! Layered configuration for the bridge binaries
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, the
//! environment, then command line flags. Validation runs once, after the last
//! layer, so a bad flag is rejected the same way as a bad file entry.

use crate::{Result, config::Settings};
use std::path::Path;
use tracing::{debug, info, warn};

/// Values given on the command line
///
/// `None` keeps whatever the file or environment provided.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub verbose: bool,
    /// Force background cookie rotation on or off
    pub auto_refresh: Option<bool>,
}

impl ConfigOverrides {
    fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if self.verbose {
            settings.logging.verbose = true;
        }
        if let Some(auto_refresh) = self.auto_refresh {
            settings.gemini.auto_refresh = auto_refresh;
        }
    }
}

/// Builds validated [`Settings`] for `gemini-bridge` and `gemini-ask`
#[derive(Debug, Default)]
pub struct ConfigLoader {
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `overrides` on top of file and environment values
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Resolve all layers and validate the result
    ///
    /// A `config_file` that does not exist is skipped with a warning; one that
    /// exists but does not parse is a [`crate::Error::Config`].
    pub fn load(&self, config_file: Option<&Path>) -> Result<Settings> {
        let mut settings = match config_file {
            Some(path) if path.exists() => {
                info!("Reading bridge configuration from {}", path.display());
                Settings::from_file(path)?
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, continuing with defaults",
                    path.display()
                );
                Settings::default()
            }
            None => Settings::default(),
        };

        settings = settings.merge_with_env()?;
        self.overrides.apply(&mut settings);
        settings.validate()?;

        debug!(
            host = %settings.server.host,
            port = settings.server.port,
            auto_refresh = settings.gemini.auto_refresh,
            refresh_minutes = settings.gemini.refresh_interval_minutes,
            "Configuration resolved"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let settings = ConfigLoader::new().load(None).unwrap();

        assert_eq!(settings.backend.init_url, "https://gemini.google.com/app");
        assert_eq!(settings.gemini.refresh_interval_minutes, 30);
    }

    #[test]
    fn test_load_from_file() {
        let file = config_file(
            r#"
[server]
host = "127.0.0.1"
port = 8080

[gemini]
secure_1psid = "file-psid"
refresh_interval_minutes = 45

[backend]
generation_timeout_secs = 60
"#,
        );

        let settings = ConfigLoader::new().load(Some(file.path())).unwrap();

        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.gemini.secure_1psid, "file-psid");
        assert_eq!(settings.gemini.refresh_interval_minutes, 45);
        assert_eq!(settings.backend.generation_timeout_secs, 60);
        // Unspecified keys keep their defaults
        assert_eq!(settings.backend.rotation_timeout_secs, 30);
        assert!(settings.gemini.auto_refresh);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = ConfigLoader::new()
            .load(Some(Path::new("/nonexistent/gemini-bridge.toml")))
            .unwrap();
        assert_eq!(
            settings.backend.rotate_url,
            Settings::default().backend.rotate_url
        );
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let file = config_file("[server\nport = ");

        let err = ConfigLoader::new().load(Some(file.path())).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_layers_apply_file_then_env_then_flags() {
        let file = config_file(
            r#"
[server]
host = "10.0.0.1"
port = 8080

[gemini]
secure_1psidcc = "file-cc"
"#,
        );
        unsafe {
            std::env::set_var("LOG_LEVEL", "trace");
            std::env::set_var("GEMINI_1PSIDCC", "env-cc");
        }

        let settings = ConfigLoader::new()
            .with_overrides(ConfigOverrides {
                port: Some(9090),
                verbose: true,
                auto_refresh: Some(false),
                ..ConfigOverrides::default()
            })
            .load(Some(file.path()));

        unsafe {
            std::env::remove_var("LOG_LEVEL");
            std::env::remove_var("GEMINI_1PSIDCC");
        }
        let settings = settings.unwrap();

        assert_eq!(settings.server.host, "10.0.0.1");
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.gemini.secure_1psidcc, "env-cc");
        assert_eq!(settings.logging.level, "trace");
        assert!(settings.logging.verbose);
        assert!(!settings.gemini.auto_refresh);
    }

    #[test]
    fn test_flags_are_validated() {
        let err = ConfigLoader::new()
            .with_overrides(ConfigOverrides {
                port: Some(0),
                ..ConfigOverrides::default()
            })
            .load(None)
            .unwrap_err();
        assert!(err.to_string().contains("port"));
    }
}
