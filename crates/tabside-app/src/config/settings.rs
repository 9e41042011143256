//! Settings loading and the default config file

use std::path::{Path, PathBuf};

use tabside_core::prelude::*;
use url::Url;

use super::types::{Settings, DEFAULT_API_URL};

const APP_DIR: &str = "tabside";
const CONFIG_FILENAME: &str = "config.toml";
const STORE_FILENAME: &str = "state.json";

/// `<config_dir>/tabside/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

/// `<data_local_dir>/tabside/state.json`, falling back to the working directory
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STORE_FILENAME)
}

/// Load settings from `config_path`.
///
/// Never fails: a missing file or one that does not parse yields defaults,
/// and individual invalid values are replaced by their defaults.
pub fn load_settings(config_path: &Path) -> Settings {
    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    let settings = match std::fs::read_to_string(config_path) {
        Ok(content) => match toml::from_str::<Settings>(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    };

    validate_settings(settings)
}

fn validate_settings(mut settings: Settings) -> Settings {
    if let Err(e) = Url::parse(&settings.annotations.api_url) {
        warn!(
            "Invalid annotations.api_url {:?} ({}), using {}",
            settings.annotations.api_url, e, DEFAULT_API_URL
        );
        settings.annotations.api_url = DEFAULT_API_URL.to_string();
    }
    settings
}

/// Resolve the store path: explicit override, then config, then default
pub fn resolve_store_path(settings: &Settings, override_path: Option<&Path>) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| settings.store.path.clone())
        .unwrap_or_else(default_store_path)
}

/// Write a commented default config at `config_path` if none exists
pub fn init_config_dir(config_path: &Path) -> Result<()> {
    if let Some(dir) = config_path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::config(format!("Failed to create {:?}: {}", dir, e)))?;
        }
    }

    if !config_path.exists() {
        let default_content = r#"# tabside configuration

[annotations]
api_url = "https://hypothes.is/api"
enabled = true             # Fetch annotation counts for the action badge

[store]
# path = "/path/to/state.json"
watch = true               # Resync when another window rewrites the store
debounce_ms = 200

[bridge]
request_timeout_ms = 10000
"#;
        std::fs::write(config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write {:?}: {}", config_path, e)))?;
        info!("Created default config at {:?}", config_path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{DEFAULT_DEBOUNCE_MS, DEFAULT_REQUEST_TIMEOUT_MS};
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_settings(&dir.path().join("config.toml"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.annotations.api_url, DEFAULT_API_URL);
        assert!(settings.annotations.enabled);
        assert!(settings.store.watch);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[annotations]
enabled = false

[bridge]
request_timeout_ms = 500
"#,
        )
        .unwrap();

        let settings = load_settings(&path);
        assert!(!settings.annotations.enabled);
        assert_eq!(settings.annotations.api_url, DEFAULT_API_URL);
        assert_eq!(settings.bridge.request_timeout_ms, 500);
        assert_eq!(settings.store.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_invalid_toml_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[annotations\nenabled = ").unwrap();

        assert_eq!(load_settings(&path), Settings::default());
    }

    #[test]
    fn test_invalid_api_url_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[annotations]\napi_url = \"not a url\"\n").unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.annotations.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_resolve_store_path_precedence() {
        let mut settings = Settings::default();
        settings.store.path = Some(PathBuf::from("/from/config.json"));

        assert_eq!(
            resolve_store_path(&settings, Some(Path::new("/from/flag.json"))),
            PathBuf::from("/from/flag.json")
        );
        assert_eq!(
            resolve_store_path(&settings, None),
            PathBuf::from("/from/config.json")
        );
        assert_eq!(
            resolve_store_path(&Settings::default(), None),
            default_store_path()
        );
    }

    #[test]
    fn test_init_config_dir_writes_loadable_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tabside").join("config.toml");

        init_config_dir(&path).unwrap();
        assert!(path.exists());

        let settings = load_settings(&path);
        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.bridge.request_timeout_ms,
            DEFAULT_REQUEST_TIMEOUT_MS
        );
    }

    #[test]
    fn test_init_config_dir_keeps_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[annotations]\nenabled = false\n").unwrap();

        init_config_dir(&path).unwrap();
        assert!(!load_settings(&path).annotations.enabled);
    }
}
