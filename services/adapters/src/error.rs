//! Error types for the adapters module

use thiserror::Error;
use types::VenueId;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Connection-related errors
    #[error("Connection failed for venue {venue}: {reason}")]
    ConnectionFailed {
        /// The venue that failed to connect
        venue: VenueId,
        /// Reason for the failure
        reason: String,
    },

    /// Connection timeout during establish
    #[error("Connection timeout for venue {venue} after {timeout_ms}ms")]
    ConnectionTimeout {
        /// The venue that timed out
        venue: VenueId,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Connection closed error
    #[error("Connection closed for venue {venue}: {reason:?}")]
    ConnectionClosed {
        /// The venue whose connection was closed
        venue: VenueId,
        /// Optional reason for closure
        reason: Option<String>,
    },

    /// Operation needs a live transport
    #[error("Not connected to venue {venue}")]
    NotConnected {
        /// The venue with no transport
        venue: VenueId,
    },

    /// Authentication rejected by the exchange, terminal for the session
    #[error("Authentication failed for venue {venue}")]
    AuthenticationFailed {
        /// The venue where auth failed
        venue: VenueId,
    },

    /// Private operation requested without API credentials
    #[error("Credentials required for private channel on venue {venue}")]
    MissingCredentials {
        /// The venue missing credentials
        venue: VenueId,
    },

    /// Remote replied to a subscribe or unsubscribe request with a failure flag
    #[error("Subscription rejected: {payload}")]
    SubscriptionRejected {
        /// Topic of the rejected request, when reported
        topic: Option<String>,
        /// Raw acknowledgement frame
        payload: serde_json::Value,
    },

    /// Remote sent an explicit error frame
    #[error("Remote error from venue {venue}: {payload}")]
    RemoteError {
        /// The venue that reported the error
        venue: VenueId,
        /// Raw error frame
        payload: serde_json::Value,
    },

    /// Parse error from exchange data
    #[error("Parse error for venue {venue}: {message} - {error}")]
    ParseError {
        /// The venue that provided the unparseable data
        venue: VenueId,
        /// Description of what was being parsed
        message: String,
        /// Underlying error message
        error: String,
    },

    /// JSON parsing error from exchange response
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Channel is not offered by the venue
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// REST endpoint answered with `success: false`
    #[error("REST call {endpoint} failed: {body}")]
    RestApi {
        /// Endpoint path
        endpoint: String,
        /// Raw response body
        body: String,
    },

    /// Rate limit exceeded on exchange API
    #[error("Rate limit exceeded for venue {venue}")]
    RateLimitExceeded {
        /// The venue that rate limited us
        venue: VenueId,
    },

    /// Venue answered that it is temporarily unavailable
    #[error("Venue {venue} unavailable (HTTP {status})")]
    ExchangeUnavailable {
        /// The unavailable venue
        venue: VenueId,
        /// HTTP status returned
        status: u16,
    },

    /// Order parameters refused by the venue
    #[error("Invalid order on {endpoint}: {body}")]
    InvalidOrder { endpoint: String, body: String },

    /// Account balance too low for the request
    #[error("Insufficient funds on {endpoint}: {body}")]
    InsufficientFunds { endpoint: String, body: String },

    /// Request timestamp outside the venue's accepted window
    #[error("Invalid nonce on {endpoint}: {body}")]
    InvalidNonce { endpoint: String, body: String },

    /// Cancel already in progress for the order
    #[error("Cancel pending on {endpoint}: {body}")]
    CancelPending { endpoint: String, body: String },

    /// WebSocket transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error in adapter settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AdapterError {
    /// Check if this error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AdapterError::ConnectionFailed { .. }
                | AdapterError::ConnectionTimeout { .. }
                | AdapterError::ConnectionClosed { .. }
                | AdapterError::NotConnected { .. }
                | AdapterError::SubscriptionRejected { .. }
                | AdapterError::RateLimitExceeded { .. }
                | AdapterError::ExchangeUnavailable { .. }
                | AdapterError::InvalidNonce { .. }
                | AdapterError::CancelPending { .. }
                | AdapterError::WebSocket(_)
                | AdapterError::Http(_)
        )
    }

    /// Check if this error indicates a permanent failure for the session
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AdapterError::AuthenticationFailed { .. }
                | AdapterError::MissingCredentials { .. }
                | AdapterError::Configuration(_)
                | AdapterError::NotSupported(_)
        )
    }

    /// True for authorization failures surfaced by the auth gate
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            AdapterError::AuthenticationFailed { .. } | AdapterError::MissingCredentials { .. }
        )
    }
}
