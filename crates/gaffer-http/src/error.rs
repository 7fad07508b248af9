use tower::timeout::error::Elapsed;

/// Failures raised while sending a request to the REST service
#[derive(thiserror::Error, Debug)]
pub enum HttpServiceError {
    /// The request could not be assembled
    #[error("HTTP error: {:?}", .0)]
    Http(#[from] http::Error),
    /// No response arrived within the configured timeout
    #[error("Request timed out")]
    TimedOut(Box<Elapsed>),
    /// The connection to the service could not be established
    #[error("Connect error: {:?}", .0)]
    Connect(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// Reading a request or response body failed
    #[error("Body error: {:?}", .0)]
    Body(Box<dyn std::error::Error + Send + Sync + 'static>),
    /// Anything the other variants do not describe
    #[error("Unexpected HTTP error: {:?}", .0)]
    Unexpected(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl HttpServiceError {
    /// Whether the service could not be reached at all
    pub fn is_connect(&self) -> bool {
        matches!(self, HttpServiceError::Connect(_))
    }

    /// Whether the request ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpServiceError::TimedOut(_))
    }
}
