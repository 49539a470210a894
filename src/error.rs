//! Error types for fleetbench.
//!
//! Every failure in the orchestration pipeline is attributable either to a
//! (host, operation) pair or to a (metric, operation) pair; the variants
//! below carry that attribution so fan-out callers can report partial
//! failures without losing context.

use thiserror::Error;

/// Result type alias for fleetbench operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for fleetbench.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The connect retry budget was exhausted. Fatal for that host only.
    #[error("Failed to connect to '{host}' after {attempts} attempts")]
    ConnectionTimeout {
        /// Target host address
        host: String,
        /// Number of probe attempts made
        attempts: u32,
    },

    /// A remote command exited with an unexpected code. Fatal for the
    /// current operation on that host; other hosts are unaffected.
    #[error("Command failed on '{host}' with exit code {exit_code}: {command}")]
    RemoteCommand {
        /// Target host address
        host: String,
        /// Exit code reported by the remote shell
        exit_code: i32,
        /// The command that was executed
        command: String,
    },

    /// File transfer (scp) failed.
    #[error("Transfer failed on '{host}': {message}")]
    Transfer {
        /// Target host address
        host: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Install Errors
    // ========================================================================
    /// No supported package manager was found on the host, or none of the
    /// candidate package names was available.
    #[error("Cannot install '{package}' on '{host}': {message}")]
    PackageNotFound {
        /// Target host address
        host: String,
        /// Package name (or comma-joined candidate list)
        package: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Aggregation Errors
    // ========================================================================
    /// An external merge/extract/summarize invocation failed. Fatal only
    /// for that metric; other metric groups keep processing.
    #[error("Aggregation of metric '{metric}' failed: {message}")]
    Aggregation {
        /// Metric name (histogram log file stem)
        metric: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO / Config Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Internal error (spawned task panicked, malformed invocation, ...).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates a new remote command error.
    pub fn remote_command(
        host: impl Into<String>,
        exit_code: i32,
        command: impl Into<String>,
    ) -> Self {
        Self::RemoteCommand {
            host: host.into(),
            exit_code,
            command: command.into(),
        }
    }

    /// Creates a new transfer error.
    pub fn transfer(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transfer {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Creates a new package-not-found error.
    pub fn package_not_found(
        host: impl Into<String>,
        package: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PackageNotFound {
            host: host.into(),
            package: package.into(),
            message: message.into(),
        }
    }

    /// Creates a new aggregation error.
    pub fn aggregation(metric: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Aggregation {
            metric: metric.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error only affects a single host, leaving the
    /// rest of the fleet usable.
    pub fn is_host_local(&self) -> bool {
        matches!(
            self,
            Error::ConnectionTimeout { .. }
                | Error::RemoteCommand { .. }
                | Error::Transfer { .. }
                | Error::PackageNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_attributed_errors_are_host_local() {
        assert!(Error::ConnectionTimeout {
            host: "10.0.0.1".to_string(),
            attempts: 300,
        }
        .is_host_local());
        assert!(Error::remote_command("10.0.0.1", 137, "fio").is_host_local());
        assert!(Error::transfer("10.0.0.1", "scp exited 1").is_host_local());
        assert!(Error::package_not_found("10.0.0.1", "fio", "no manager").is_host_local());
    }

    #[test]
    fn systemic_errors_are_not_host_local() {
        assert!(!Error::aggregation("latency", "union failed").is_host_local());
        assert!(!Error::Internal("task panicked".to_string()).is_host_local());
        assert!(!Error::InvalidConfig {
            key: "ssh_options".to_string(),
            message: "unterminated quote".to_string(),
        }
        .is_host_local());
    }
}
