//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_root_folder())
}

/// Get default configuration file path for the platform
fn find_config_file() -> Result<PathBuf> {
    let config_path = if cfg!(target_os = "linux") {
        // Try ~/.config/shien/config.toml first, then /etc/shien/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("shien").join("config.toml"));
        let system_config = PathBuf::from("/etc/shien/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else {
        dirs::config_dir()
            .map(|d| d.join("shien").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    };

    if config_path.exists() {
        Ok(config_path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_path)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("shien"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/shien"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("shien"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/shien"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("shien"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\shien"))
    } else {
        PathBuf::from("./shien_data")
    }
}

/// Ensure the root folder exists and return the database path inside it
pub fn prepare_root_folder(root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    Ok(root.join("shien.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let resolved = resolve_root_folder(Some("/tmp/shien-test"), "SHIEN_TEST_UNSET_VAR").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/shien-test"));
    }

    #[test]
    fn env_var_beats_default() {
        std::env::set_var("SHIEN_TEST_ROOT_VAR", "/tmp/shien-env");
        let resolved = resolve_root_folder(None, "SHIEN_TEST_ROOT_VAR").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/shien-env"));
        std::env::remove_var("SHIEN_TEST_ROOT_VAR");
    }

    #[test]
    fn prepare_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("root");
        let db_path = prepare_root_folder(&root).unwrap();
        assert!(root.exists());
        assert!(db_path.ends_with("shien.db"));
    }
}
