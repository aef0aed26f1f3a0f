// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the Lumina binary.

use thiserror::Error;

/// Result type alias for lumina-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the Lumina binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// The configuration file is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Config parsing error.
    #[error("Config error: {0}")]
    Config(#[from] lumina_config::ConfigError),

    /// Access context could not be assembled.
    #[error("Context error: {0}")]
    Context(#[from] lumina_core::ContextError),

    /// API client error.
    #[error("API error: {0}")]
    Api(#[from] lumina_api::ApiError),

    /// Access evaluation did not reach a decision.
    #[error("Access unsettled: {0}")]
    Unsettled(String),

    /// Command output could not be rendered.
    #[error("Output error: {0}")]
    Output(String),
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an unsettled error.
    pub fn unsettled(msg: impl Into<String>) -> Self {
        Self::Unsettled(msg.into())
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Context(_) => 2,
            Self::Unsettled(_) => 3,
            Self::Output(_) => 4,
            Self::Api(_) => 5,
        }
    }
}

// `anyhow` only carries serialization failures from the output helpers.
impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Output(format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with its cause chain.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================
