use crate::model::{ConnectionParameters, Credentials};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{fs, io::ErrorKind, path::PathBuf};
use tracing::debug;

pub const DEFAULT_APPLICATION_ID: &str = "girder-cli";
pub const DEFAULT_CONFIGURATION_FILE_NAME: &str = "config.yml";
pub const CONFIGURATION_DIRECTORY_VARIABLE: &str = "GIRDER_CLI_CONFIG_DIR";

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("failed to resolve the configuration directory")]
    FailedToFindConfigurationDirectory,
    #[error("failed to load configuration data from {path:?}, because of: {cause}")]
    FailedToLoadData {
        path: PathBuf,
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Defaults for the global command line options.
///
/// Every value here is overridden by the matching option on the command line.
/// Passwords are deliberately not part of the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(flatten)]
    connection: ConnectionParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_key: Option<String>,
}

impl Configuration {
    pub fn connection(&self) -> &ConnectionParameters {
        &self.connection
    }

    /// Credential defaults, never carrying a password.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: None,
            api_key: self.api_key.clone(),
        }
    }

    pub fn get_default_configuration_file_path() -> Result<PathBuf, ConfigurationError> {
        if let Ok(config_dir_str) = std::env::var(CONFIGURATION_DIRECTORY_VARIABLE) {
            let mut config_path = PathBuf::from(config_dir_str);
            config_path.push(DEFAULT_CONFIGURATION_FILE_NAME);
            return Ok(config_path);
        }

        match config_dir() {
            Some(mut default_config_file_path) => {
                default_config_file_path.push(DEFAULT_APPLICATION_ID);
                default_config_file_path.push(DEFAULT_CONFIGURATION_FILE_NAME);
                Ok(default_config_file_path)
            }
            None => Err(ConfigurationError::FailedToFindConfigurationDirectory),
        }
    }

    /// Load the default configuration file, or the empty configuration if the
    /// file does not exist.
    pub fn load_or_default() -> Result<Configuration, ConfigurationError> {
        let path = Configuration::get_default_configuration_file_path()?;
        debug!("Loading configuration from {}...", path.display());

        match Configuration::load_from_file(path) {
            Ok(configuration) => Ok(configuration),
            Err(ConfigurationError::FailedToLoadData { path, cause }) => {
                match cause.downcast_ref::<std::io::Error>() {
                    Some(io_err) if io_err.kind() == ErrorKind::NotFound => {
                        debug!("No configuration file at {}, using defaults", path.display());
                        Ok(Configuration::default())
                    }
                    _ => Err(ConfigurationError::FailedToLoadData { path, cause }),
                }
            }
            Err(e) => Err(e),
        }
    }

    pub fn load_from_file(path: PathBuf) -> Result<Configuration, ConfigurationError> {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(cause) => {
                return Err(ConfigurationError::FailedToLoadData {
                    path,
                    cause: Box::new(cause),
                })
            }
        };

        // An empty file is a valid, empty configuration.
        if content.trim().is_empty() {
            return Ok(Configuration::default());
        }

        serde_yaml::from_str(&content).map_err(|cause| ConfigurationError::FailedToLoadData {
            path,
            cause: Box::new(cause),
        })
    }
}
