//! Error types for the conversation engine.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via
//! [`GatewayError::code()`]. Codes are part of the public API contract and
//! will not change.
//!
//! Gateway failures never escape the generation controller: they are
//! converted into terminal message states and a user-readable notice. The
//! raw error is logged for diagnostics only.

/// Stable error codes for programmatic error handling.
///
/// These codes never change and form part of the public API contract.
/// Use these for distinguishing errors rather than parsing Display output.
pub mod error_codes {
    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Authentication failed (invalid/missing API key).
    pub const AUTH_FAILED: &str = "AUTH_FAILED";

    /// Request to the text-generation service failed.
    pub const REQUEST_FAILED: &str = "REQUEST_FAILED";

    /// The upstream service reported transient overload.
    pub const OVERLOADED: &str = "OVERLOADED";

    /// Image generation failed or returned no image.
    pub const IMAGE_FAILED: &str = "IMAGE_FAILED";

    /// Provider-specific error not covered by other variants.
    pub const PROVIDER_ERROR: &str = "PROVIDER_ERROR";
}

/// Errors produced by model gateway calls.
///
/// Each variant includes a stable error code accessible via
/// [`GatewayError::code()`]. The Display impl formats as `[CODE] message`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Invalid or missing configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    ConfigError(String),

    /// Authentication failed (invalid/missing API key).
    #[error("[{}] {}", error_codes::AUTH_FAILED, .0)]
    AuthError(String),

    /// Request to the text-generation service failed.
    #[error("[{}] {}", error_codes::REQUEST_FAILED, .0)]
    RequestError(String),

    /// The upstream service reported transient overload (429/503).
    #[error("[{}] {}", error_codes::OVERLOADED, .0)]
    Overloaded(String),

    /// Image generation failed or returned no image reference.
    #[error("[{}] {}", error_codes::IMAGE_FAILED, .0)]
    ImageError(String),

    /// Provider-specific error not covered by other variants.
    #[error("[{}] {}", error_codes::PROVIDER_ERROR, .0)]
    ProviderError(String),
}

impl GatewayError {
    /// Returns the stable error code for this error.
    ///
    /// Codes are SCREAMING_SNAKE_CASE strings that remain stable across
    /// releases. Use these for programmatic error handling rather than
    /// parsing Display output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => error_codes::CONFIG_INVALID,
            Self::AuthError(_) => error_codes::AUTH_FAILED,
            Self::RequestError(_) => error_codes::REQUEST_FAILED,
            Self::Overloaded(_) => error_codes::OVERLOADED,
            Self::ImageError(_) => error_codes::IMAGE_FAILED,
            Self::ProviderError(_) => error_codes::PROVIDER_ERROR,
        }
    }

    /// Returns the inner message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::ConfigError(m)
            | Self::AuthError(m)
            | Self::RequestError(m)
            | Self::Overloaded(m)
            | Self::ImageError(m)
            | Self::ProviderError(m) => m,
        }
    }

    /// Returns true if this error represents a transient failure.
    ///
    /// The controller does not retry automatically either way; this is
    /// surfaced so embedders can distinguish "try again later" notices
    /// from configuration problems.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConfigError(_) | Self::AuthError(_) => false,
            Self::Overloaded(_) | Self::RequestError(_) => true,
            Self::ImageError(_) | Self::ProviderError(_) => false,
        }
    }
}

/// Convenience alias for gateway results.
pub type Result<T> = std::result::Result<T, GatewayError>;
