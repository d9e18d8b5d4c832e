//! Error types for deskdb.
//!
//! Defines the main error enum used throughout the driver.

use thiserror::Error;

/// Main error type for deskdb operations.
#[derive(Error, Debug)]
pub enum DeskError {
    /// Bad caller input (blank SQL, missing database file, etc.)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted on a session that was never opened or is closed.
    #[error("Session not open: {0}")]
    NotOpen(String),

    /// The engine could not start or could not open the database file.
    #[error("Open failed: {0}")]
    OpenFailure(String),

    /// The engine rejected a statement or reported a row-level failure.
    #[error("Engine error: {0}")]
    EngineFailure(String),

    /// Reading a field's metadata or value failed.
    #[error("Field read error: {0}")]
    FieldRead(String),

    /// Reading the value of an empty large-binary field failed.
    #[error("Empty binary field: {0}")]
    EmptyBinaryField(String),

    /// A single linked table could not be re-established.
    #[error("Link refresh error: {0}")]
    LinkRefresh(String),

    /// Configuration errors (invalid config file, unknown engine, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeskError {
    /// Creates an invalid argument error with the given message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates a not-open error with the given message.
    pub fn not_open(msg: impl Into<String>) -> Self {
        Self::NotOpen(msg.into())
    }

    /// Creates an open failure with the given message.
    pub fn open_failure(msg: impl Into<String>) -> Self {
        Self::OpenFailure(msg.into())
    }

    /// Creates an engine failure with the given message.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::EngineFailure(msg.into())
    }

    /// Creates a field read error with the given message.
    pub fn field_read(msg: impl Into<String>) -> Self {
        Self::FieldRead(msg.into())
    }

    /// Creates an empty binary field error for the named field.
    pub fn empty_binary(field: impl Into<String>) -> Self {
        Self::EmptyBinaryField(field.into())
    }

    /// Creates a link refresh error with the given message.
    pub fn link_refresh(msg: impl Into<String>) -> Self {
        Self::LinkRefresh(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns true for the one read failure the materializer coerces to null.
    pub fn is_empty_binary_read(&self) -> bool {
        matches!(self, Self::EmptyBinaryField(_))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "Invalid Argument",
            Self::NotOpen(_) => "Not Open",
            Self::OpenFailure(_) => "Open Failure",
            Self::EngineFailure(_) => "Engine Failure",
            Self::FieldRead(_) | Self::EmptyBinaryField(_) => "Field Read Failure",
            Self::LinkRefresh(_) => "Link Refresh Failure",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using DeskError.
pub type Result<T> = std::result::Result<T, DeskError>;
