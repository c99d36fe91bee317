use shot_balance::Reason;

/// Errors produced by the Tower Shot Balance middleware stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShotError {
    /// Every backend had reached its per-second ceiling.
    ///
    /// When the `axum` feature is enabled, this converts to `503 Service Unavailable`
    /// with a `Retry-After` header.
    #[error("All backends are saturated; request shed")]
    Overloaded,

    /// No backend became available before the retry budget ran out.
    ///
    /// When the `axum` feature is enabled, this converts to `503 Service Unavailable`
    /// with a `Retry-After` header.
    #[error("No backend became available within {attempts} attempts")]
    Exhausted {
        /// The attempt budget that was exhausted.
        attempts: usize,
    },

    /// The request exceeded the maximum allowed time.
    ///
    /// When the `axum` feature is enabled, this converts to `408 Request Timeout`.
    #[error("Request timed out waiting for a backend")]
    Timeout,

    /// The wait for a backend was cancelled.
    ///
    /// When the `axum` feature is enabled, this converts to `503 Service Unavailable`.
    #[error("Wait for a backend was cancelled")]
    Cancelled,

    /// An unexpected error occurred in the backend service.
    ///
    /// The string contains the `Display` representation of the backend error.
    /// When the `axum` feature is enabled, this converts to `500 Internal Server Error`.
    #[error("Internal service error: {0}")]
    Inner(String),
}

impl From<Reason> for ShotError {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::Saturated => Self::Overloaded,
            Reason::Exhausted { attempts } => Self::Exhausted { attempts },
            Reason::Cancelled => Self::Cancelled,
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ShotError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        // Capacity frees up at the next one-second window
        let retry_after = || {
            Some((
                axum::http::header::RETRY_AFTER,
                axum::http::HeaderValue::from(1u64),
            ))
        };

        let (status, msg, headers) = match self {
            Self::Overloaded | Self::Exhausted { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                self.to_string(),
                retry_after(),
            ),
            Self::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, self.to_string(), None),
            Self::Timeout => (StatusCode::REQUEST_TIMEOUT, self.to_string(), None),
            Self::Inner(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string(), None),
        };

        let mut response = (status, msg).into_response();
        if let Some((name, value)) = headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}
