//! Errors from talking to the annotation backend.

/// Failure of a single fetch or save. The poller never surfaces these to the
/// engine; it logs them and substitutes fallback data.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("invalid base URL `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Request(String),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response parse failed: {0}")]
    Parse(String),
}
