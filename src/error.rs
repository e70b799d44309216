use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

use crate::{
    client::ClientError, commands::registry::RegistryError, configuration::ConfigurationError,
    exit_codes::GirderExitCode,
};

/// Error types that can occur during CLI command execution
#[derive(Debug, Error)]
pub enum CliError {
    /// Error when no registered command matches the parsed subcommand
    #[error("Undefined or unsupported subcommand: {0}")]
    UnsupportedSubcommand(String),
    /// Error related to configuration loading
    #[error("Configuration error: {0}")]
    ConfigurationError(#[from] ConfigurationError),
    /// Error while assembling the command line interface
    #[error("Command registration error: {0}")]
    RegistryError(#[from] RegistryError),
    /// Error when a required command-line argument is missing
    #[error("Missing required argument: {0}")]
    MissingRequiredArgument(String),
    /// The command only works on folders
    #[error("{command} command only accepts parent-type of folder")]
    InvalidParentType {
        command: String,
        parent_type: String,
    },
    /// The parent type is none of the types Girder knows
    #[error("Unknown parent type {0:?}, expected one of collection, folder, user")]
    UnknownParentType(String),
    #[error("Local folder does not exist: {0:?}")]
    LocalFolderNotFound(PathBuf),
    #[error("{0}")]
    ClientError(#[from] ClientError),
}

impl CliError {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> GirderExitCode {
        match self {
            CliError::UnsupportedSubcommand(_) => GirderExitCode::UsageError,
            CliError::ConfigurationError(_) => GirderExitCode::ConfigError,
            CliError::RegistryError(_) => GirderExitCode::SoftwareError,
            CliError::MissingRequiredArgument(_) => GirderExitCode::UsageError,
            CliError::InvalidParentType { .. } => GirderExitCode::UsageError,
            CliError::UnknownParentType(_) => GirderExitCode::UsageError,
            CliError::LocalFolderNotFound(_) => GirderExitCode::NoInput,
            CliError::ClientError(e) => client_exit_code(e),
        }
    }
}

fn client_exit_code(error: &ClientError) -> GirderExitCode {
    match error {
        ClientError::HttpError(_) => GirderExitCode::NetworkError,
        ClientError::Json(_) => GirderExitCode::DataError,
        ClientError::Io(_) => GirderExitCode::IoError,
        ClientError::Url(_) | ClientError::Endpoint(_) => GirderExitCode::UsageError,
        ClientError::AuthenticationFailed(_) | ClientError::PasswordPrompt(_) => {
            GirderExitCode::AuthError
        }
        ClientError::Api { status, .. }
            if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
        {
            GirderExitCode::AuthError
        }
        ClientError::Api { .. } => GirderExitCode::ApiError,
        ClientError::InvalidParent(_) => GirderExitCode::UsageError,
        ClientError::LocalPathNotFound(_) => GirderExitCode::NoInput,
    }
}
