use thiserror::Error;

/// Failures surfaced by the portal client.
///
/// Every operation returns one of these to its immediate caller; the CLI turns
/// them into a non-zero exit, the tool server into an `isError` result.
#[derive(Debug, Error)]
pub enum WilmaError {
    /// Credentials rejected, or a renewed session failed again.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The page no longer has the shape we expect.
    #[error("unexpected page format: {0}")]
    Parse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("could not understand date '{0}'")]
    DateParse(String),

    #[error("network error: {0}")]
    Network(String),
}

impl WilmaError {
    /// Short stable label, used as the prefix of tool error texts.
    pub fn kind(&self) -> &'static str {
        match self {
            WilmaError::Authentication(_) => "AuthenticationError",
            WilmaError::Parse(_) => "ParseError",
            WilmaError::NotFound(_) => "NotFound",
            WilmaError::InvalidArgument(_) | WilmaError::DateParse(_) => "InvalidArgument",
            WilmaError::Network(_) => "NetworkError",
        }
    }
}

impl From<reqwest::Error> for WilmaError {
    fn from(e: reqwest::Error) -> Self {
        WilmaError::Network(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WilmaError>;
