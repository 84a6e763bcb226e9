//! Backend call errors

/// Failure of a single backend call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Transport failure: unreachable host, refused connection, timeout
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Server-reported message, or the status text
        message: String,
    },

    /// Body that is not the expected JSON
    #[error("malformed response: {0}")]
    Malformed(String),

    /// 2xx response reporting a failure (`success: false` or an `error` field)
    #[error("{0}")]
    Rejected(String),
}

impl ClientError {
    /// Transport-level failure
    #[inline]
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Message reported by the server, if any
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Rejected(message) => Some(message),
            Self::Network(_) | Self::Malformed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_only_for_server_reported_errors() {
        let status = ClientError::Status {
            status: 404,
            message: "Migration not found".to_string(),
        };
        assert_eq!(status.server_message(), Some("Migration not found"));
        assert_eq!(
            ClientError::Rejected("bad credentials".to_string()).server_message(),
            Some("bad credentials")
        );
        assert_eq!(ClientError::Network("refused".to_string()).server_message(), None);
        assert!(ClientError::Network("refused".to_string()).is_network());
    }

    #[test]
    fn display_includes_status() {
        let err = ClientError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }
}
