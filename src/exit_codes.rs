//! Process exit codes for girder-cli
//!
//! Every failure maps to a non-zero code. The values follow the BSD
//! sysexits.h conventions where one fits, with a few application-specific
//! codes above 100 for remote failures.

/// Exit codes returned by the `girder-cli` binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GirderExitCode {
    /// Success (0) - Command completed successfully
    Success = 0,

    /// Command line usage error (64) - e.g. an unsupported parent type
    UsageError = 64,

    /// Data format error (65) - a server or metadata document could not be parsed
    DataError = 65,

    /// Cannot open input (66) - the local folder does not exist
    NoInput = 66,

    /// Internal software error (70)
    SoftwareError = 70,

    /// I/O error (74) - reading or writing local files failed
    IoError = 74,

    /// Configuration error (78)
    ConfigError = 78,

    /// Authentication error (100) - login, API key or password prompt
    AuthError = 100,

    /// Network error (101) - the Girder server could not be reached
    NetworkError = 101,

    /// API error (102) - the Girder server answered with an error status
    ApiError = 102,
}

impl GirderExitCode {
    /// Convert to numeric exit code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get descriptive message for the exit code
    pub fn message(&self) -> &'static str {
        match self {
            GirderExitCode::Success => "Success",
            GirderExitCode::UsageError => "Command line usage error",
            GirderExitCode::DataError => "Data format error",
            GirderExitCode::NoInput => "Cannot open input",
            GirderExitCode::SoftwareError => "Internal software error",
            GirderExitCode::IoError => "Input/output error",
            GirderExitCode::ConfigError => "Configuration error",
            GirderExitCode::AuthError => "Authentication error",
            GirderExitCode::NetworkError => "Network communication error",
            GirderExitCode::ApiError => "Remote API error",
        }
    }
}
