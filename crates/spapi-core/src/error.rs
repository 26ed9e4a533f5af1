use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpapiError>;

#[derive(Debug, Error)]
pub enum SpapiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid path expression: {0}")]
    InvalidPath(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("upstream query failed: {0}")]
    UpstreamGraphql(String),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl SpapiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::InvalidPath(_) => "INVALID_PATH",
            Self::Config(_) => "CONFIG_ERROR",
            Self::UpstreamStatus { .. } => "UPSTREAM_STATUS",
            Self::UpstreamGraphql(_) => "UPSTREAM_GRAPHQL",
            Self::MalformedResponse(_) => "MALFORMED_RESPONSE",
            Self::Http(_) => "HTTP_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures caused by the remote service or its payloads.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamStatus { .. }
                | Self::UpstreamGraphql(_)
                | Self::MalformedResponse(_)
                | Self::Http(_)
                | Self::Json(_)
        )
    }
}
