//! Error types and handling for Phoros
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Phoros operations
pub type Result<T> = std::result::Result<T, PhorosError>;

/// Main error type for Phoros
#[derive(Debug, Error)]
pub enum PhorosError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Backend rejected a request (non-2xx other than 404)
    #[error("API error: {message}")]
    Api { message: String },

    /// The backend does not know the referenced resource
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Recovery store errors
    #[error("Store error: {message}")]
    Store { message: String },

    /// Payment settlement errors
    #[error("Payment error: {message}")]
    Payment { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl PhorosError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        PhorosError::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        PhorosError::Api {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        PhorosError::NotFound {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        PhorosError::Network {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        PhorosError::Store {
            message: message.into(),
        }
    }

    /// Create a new payment error
    pub fn payment<S: Into<String>>(message: S) -> Self {
        PhorosError::Payment {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        PhorosError::Io {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        PhorosError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        PhorosError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        PhorosError::Generic {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later may succeed.
    ///
    /// Network and timeout failures say nothing about server-side state;
    /// everything else is an authoritative answer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PhorosError::Network { .. } | PhorosError::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for PhorosError {
    fn from(err: std::io::Error) -> Self {
        PhorosError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for PhorosError {
    fn from(err: serde_yaml::Error) -> Self {
        PhorosError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PhorosError {
    fn from(err: serde_json::Error) -> Self {
        PhorosError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PhorosError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PhorosError::timeout(err.to_string())
        } else {
            PhorosError::network(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for PhorosError {
    fn from(err: chrono::ParseError) -> Self {
        PhorosError::validation("datetime", &err.to_string())
    }
}
