//! Error types for rate sampling.

/// Errors that can occur while taking a rate sample.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// The block source could not be reached.
    #[error("block source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    /// The block source answered with data that could not be read.
    #[error("invalid block data: {0}")]
    Decode(String),

    /// The source returned no block records.
    #[error("block window is empty")]
    EmptyWindow,

    /// The sampling window is zero.
    #[error("sampling window must be greater than zero")]
    InvalidWindow,

    /// The source did not answer within the request timeout.
    #[error("block request timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl SampleError {
    /// Creates a new source unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a new decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Returns true if this is a transient error that might succeed on the
    /// next sample.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::Timeout { .. } | Self::EmptyWindow
        )
    }

    /// Short label used as the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "unavailable",
            Self::Decode(_) => "decode_error",
            Self::EmptyWindow => "empty",
            Self::InvalidWindow => "invalid_window",
            Self::Timeout { .. } => "timeout",
        }
    }
}
