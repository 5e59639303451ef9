//! Error types for the MGit MCP server.

use thiserror::Error;

/// Main error type for MGit MCP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// External command could not be started at all
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        /// Program that was looked up
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// External push command ran and exited unsuccessfully
    #[error("{}", push_failure_message(.exit_code))]
    PushFailed {
        /// Exit code, `None` when the child was killed by a signal
        exit_code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML configuration file could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn push_failure_message(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("Command exited with code {code}"),
        None => "Command terminated by signal".to_string(),
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = Error::Config("REPO_NAME is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: REPO_NAME is required"
        );
    }

    #[test]
    fn test_launch_error() {
        let err = Error::Launch {
            program: "mgit".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "Failed to launch 'mgit': not found");
    }

    #[test]
    fn test_push_failed_with_code() {
        let err = Error::PushFailed {
            exit_code: Some(128),
            stdout: String::new(),
            stderr: "rejected".to_string(),
        };
        assert_eq!(err.to_string(), "Command exited with code 128");
    }

    #[test]
    fn test_push_failed_by_signal() {
        let err = Error::PushFailed {
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "Command terminated by signal");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<Vec<i32>>("{ not: a list").unwrap_err();
        let err: Error = yaml_err.into();
        assert!(matches!(err, Error::Yaml(_)));
    }
}
