/// Error types for fanfetch.
///
/// `FetchError` never escapes a fetch task: its `Display` output is the status
/// line reported for the failed URL. `FanfetchError` covers everything that can
/// stop the program before any task starts.
use thiserror::Error;

/// Top-level error type for setup failures.
#[derive(Debug, Error)]
pub enum FanfetchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single fetch task.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be turned into a request. No network attempt was made.
    #[error("ERROR building request for {url}: {detail}")]
    InvalidRequest { url: String, detail: String },

    /// Transport failure, rejected status, or the shared deadline fired.
    #[error("ERROR downloading {url}: {detail}")]
    Download { url: String, detail: String },

    #[error("ERROR creating file: {0}")]
    CreateFile(#[source] std::io::Error),

    #[error("ERROR writing to file: {0}")]
    Write(#[source] std::io::Error),
}

impl FetchError {
    pub fn invalid_request(url: &str, detail: impl std::fmt::Display) -> Self {
        FetchError::InvalidRequest {
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn download(url: &str, detail: impl std::fmt::Display) -> Self {
        FetchError::Download {
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Short machine-friendly kind, used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidRequest { .. } => "invalid_request",
            FetchError::Download { .. } => "download",
            FetchError::CreateFile(_) => "create_file",
            FetchError::Write(_) => "write",
        }
    }

    /// Whether the failure happened before any network traffic.
    pub fn is_local(&self) -> bool {
        matches!(self, FetchError::InvalidRequest { .. })
    }
}

/// Result type alias for fanfetch setup operations.
pub type FanfetchResult<T> = Result<T, FanfetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_names_url() {
        let err = FetchError::download("https://example.com", "deadline exceeded");
        assert_eq!(
            err.to_string(),
            "ERROR downloading https://example.com: deadline exceeded"
        );
        assert_eq!(err.kind(), "download");
    }

    #[test]
    fn test_file_errors_prefix() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            FetchError::CreateFile(io).to_string(),
            "ERROR creating file: denied"
        );

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(
            FetchError::Write(io).to_string(),
            "ERROR writing to file: disk full"
        );
    }

    #[test]
    fn test_invalid_request_is_local() {
        let err = FetchError::invalid_request("example.com", "relative URL without a base");
        assert!(err.is_local());
        assert!(err.to_string().starts_with("ERROR building request for example.com"));
    }
}
