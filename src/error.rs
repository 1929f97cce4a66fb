//! Error types for the repo-ledger library.

/// All errors that can occur when reading, writing or preparing ledger
/// documents.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// HTTP client construction or a request failed in a way that is not
    /// worth retrying.
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document body could not be decoded.
    #[error("invalid encoding for {path}: {reason}")]
    Encoding {
        /// Document path.
        path: String,
        /// What was wrong with the body.
        reason: String,
    },

    /// The provider rejected the credentials (HTTP 401/403).
    #[error(
        "access denied for {path} (HTTP {status}): {body}; check that the access token is valid, \
         that it has read/write scope on the repository contents, and that the branch exists"
    )]
    AccessDenied {
        /// Document path.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response body returned by the provider.
        body: String,
    },

    /// The version precondition failed again after one reload-and-retry.
    #[error(
        "{path} was changed by someone else at the same time; reload the data and apply your edit again"
    )]
    Conflict {
        /// Document path.
        path: String,
    },

    /// Waiting out a rate limit did not succeed.
    #[error("rate limit wait failed: {0}")]
    RateLimited(String),

    /// Timeouts or transport errors persisted past the retry bound.
    #[error(
        "request for {path} failed after {attempts} attempts: {reason}; check network connectivity, \
         the repository name and the branch"
    )]
    Transient {
        /// Document path.
        path: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last transport error.
        reason: String,
    },

    /// The document store answered with an unexpected status.
    #[error("document store returned HTTP {status} for {path}: {message}")]
    Store {
        /// Document path.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// A local storage backend failed.
    #[error("storage backend error: {0}")]
    Storage(Box<dyn core::error::Error + Send + Sync>),

    /// A required connection setting was not provided.
    #[error("missing connection setting: {0}")]
    MissingSetting(&'static str),

    /// The caller passed an argument the operation cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The acting user lacks the required role.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_from_serde_json() {
        let serde_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err = LedgerError::from(serde_err);
        assert!(matches!(err, LedgerError::Serialization(_)));
        assert!(err.to_string().contains("serialization error"));
    }

    #[test]
    fn access_denied_message_is_actionable() {
        let err = LedgerError::AccessDenied {
            path: "data/contas.json".to_owned(),
            status: 401,
            body: "Bad credentials".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("HTTP 401"));
        assert!(msg.contains("token"));
        assert!(msg.contains("branch"));
    }

    #[test]
    fn conflict_message_asks_to_reapply() {
        let err = LedgerError::Conflict {
            path: "data/metas.json".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("data/metas.json"));
        assert!(msg.contains("apply your edit again"));
    }

    #[test]
    fn transient_message_names_attempts() {
        let err = LedgerError::Transient {
            path: "data/orcamentos.json".to_owned(),
            attempts: 4,
            reason: "operation timed out".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("4 attempts"));
        assert!(msg.contains("connectivity"));
    }

    #[test]
    fn storage_error_display() {
        let inner = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = LedgerError::Storage(Box::new(inner));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LedgerError>();
    }
}
