use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for the circulation manager.
///
/// Holds the settings that identify an installation: the library's display
/// name and where its snapshot file lives. Loan policy (period, fee
/// schedule) is compile-time fixed in [`crate::domain::policy`] and is
/// deliberately absent here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Display name of the library, shown in reports and summaries.
    pub name: String,

    /// Path of the JSON snapshot file holding catalog and membership state.
    ///
    /// Relative paths are resolved against the working directory.
    pub data_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_file: default_data_file(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or
    /// if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }
}

fn default_name() -> String {
    "Library".to_string()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("library.json")
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the
/// domain type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_name")]
        name: String,

        #[serde(default = "default_data_file")]
        data_file: PathBuf,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 { name, data_file } => Self { name, data_file },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            name: config.name,
            data_file: config.data_file,
        }
    }
}
