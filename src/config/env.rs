//! Environment-driven settings.
//!
//! Values are read from the process environment after `.env` in the project
//! directory has been merged into it. Variables already present in the
//! environment win over `.env` entries.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Name of the dotenv file inside the project directory.
const DOTENV_FILE: &str = ".env";

/// Settings the scripts read from the environment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvSettings {
    /// Enables source verification on non-development networks.
    pub etherscan_api_key: Option<String>,
    /// Enables the frontend sync deploy step.
    pub update_front_end: bool,
    /// Hex-encoded deployer key.
    pub private_key: Option<String>,
}

/// Merge `<dir>/.env` into the process environment, if the file exists.
///
/// Returns `true` when a file was loaded.
pub fn load_dotenv(dir: &Path) -> Result<bool> {
    let path = dir.join(DOTENV_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "no .env file");
        return Ok(false);
    }

    dotenvy::from_path(&path)
        .with_context(|| format!("failed to load environment file: {}", path.display()))?;
    debug!(path = %path.display(), ".env loaded");
    Ok(true)
}

impl EnvSettings {
    /// Read settings from the current process environment.
    pub fn from_env() -> Self {
        Self {
            etherscan_api_key: non_empty_var("ETHERSCAN_API_KEY"),
            update_front_end: non_empty_var("UPDATE_FRONT_END")
                .map(|v| is_enabled(&v))
                .unwrap_or(false),
            private_key: non_empty_var("PRIVATE_KEY"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Any non-empty value enables a flag except explicit `false`, `0` or `no`.
fn is_enabled(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 3] = ["ETHERSCAN_API_KEY", "UPDATE_FRONT_END", "PRIVATE_KEY"];

    fn clear() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();

        assert_eq!(EnvSettings::from_env(), EnvSettings::default());
    }

    #[test]
    fn update_front_end_flag_values() {
        assert!(is_enabled("true"));
        assert!(is_enabled("1"));
        assert!(is_enabled("yes"));
        assert!(!is_enabled("false"));
        assert!(!is_enabled("FALSE"));
        assert!(!is_enabled("0"));
        assert!(!is_enabled(" no "));
    }

    #[test]
    fn blank_values_are_ignored() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();
        env::set_var("ETHERSCAN_API_KEY", "   ");

        assert_eq!(EnvSettings::from_env().etherscan_api_key, None);
        clear();
    }

    #[test]
    fn dotenv_file_populates_settings() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear();

        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(DOTENV_FILE),
            "ETHERSCAN_API_KEY=abc123\nUPDATE_FRONT_END=true\n",
        )
        .unwrap();

        assert!(load_dotenv(tmp.path()).unwrap());
        let settings = EnvSettings::from_env();
        assert_eq!(settings.etherscan_api_key.as_deref(), Some("abc123"));
        assert!(settings.update_front_end);
        assert_eq!(settings.private_key, None);

        clear();
    }

    #[test]
    fn missing_dotenv_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!load_dotenv(tmp.path()).unwrap());
    }
}
