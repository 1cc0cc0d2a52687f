/*!
 * Error types for the polyglot-mt library.
 *
 * This module contains custom error types for the different layers of the
 * machine translation stack, using the thiserror crate for ergonomic
 * error definitions:
 * - `ProviderError`: failures of a single provider call (transport level)
 * - `MtError`: failures of an orchestration call (validation or propagated transport errors)
 * - `AppError`: top-level wrapper used by the command line front-end
 */

use thiserror::Error;

use crate::model::MtServiceType;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        /// Message from the API
        message: String,
        /// Seconds to wait before retrying, when the API says so
        retry_after_secs: Option<u64>,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The account behind the provider has no credits left
    #[error("Out of credits: {0}")]
    OutOfCredits(String),

    /// The provider cannot translate into or out of the requested language
    #[error("Language not supported by provider: {0}")]
    UnsupportedLanguage(String),
}

impl ProviderError {
    /// Whether repeating the same call later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded { .. } | Self::OutOfCredits(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors that can occur during a machine translation orchestration call
#[derive(Error, Debug)]
pub enum MtError {
    /// Base text exceeds the configured maximum length
    #[error("Translation text too long: {length} characters (maximum is {max})")]
    TextTooLong {
        /// Length of the rejected text in characters
        length: usize,
        /// Configured maximum
        max: usize,
    },

    /// A requested service is not enabled for the target language
    #[error("Machine translation service not enabled: {0}")]
    ServiceNotEnabled(MtServiceType),

    /// The project has no base language configured
    #[error("Base language not found")]
    BaseLanguageNotFound,

    /// Error from the provider transport
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from one of the external lookups (settings, catalog, translation memory)
    #[error("Lookup failed: {0}")]
    Lookup(String),
}

impl MtError {
    /// Whether the caller can fix the request and try again
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::TextTooLong { .. } | Self::ServiceNotEnabled(_) | Self::BaseLanguageNotFound
        )
    }
}

impl From<anyhow::Error> for MtError {
    fn from(error: anyhow::Error) -> Self {
        Self::Lookup(format!("{:#}", error))
    }
}

/// Result alias for orchestration calls
pub type MtResult<T> = Result<T, MtError>;

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from machine translation
    #[error("Translation error: {0}")]
    Translation(#[from] MtError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
