//! Error types for remote API clients.

/// Errors returned by the MultiversX and CoinMarketCap clients.
///
/// Clients never substitute placeholder data; every failure surfaces here
/// and the caller decides the fallback.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request could not be sent or the response body not read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    /// The response body could not be decoded.
    #[error("failed to decode {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// The response was valid JSON but lacked a required field.
    #[error("missing '{field}' in {endpoint} response")]
    MissingData { endpoint: String, field: String },
}

impl SourceError {
    /// Creates a new status error.
    pub fn status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Creates a new decode error.
    pub fn decode(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new missing data error.
    pub fn missing(endpoint: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingData {
            endpoint: endpoint.into(),
            field: field.into(),
        }
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Decode { .. } | Self::MissingData { .. } => false,
        }
    }
}

impl From<SourceError> for pulse_sampler::SampleError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Decode { .. } | SourceError::MissingData { .. } => {
                Self::decode(err.to_string())
            },
            other => Self::unavailable(other.to_string()),
        }
    }
}
