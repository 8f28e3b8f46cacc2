use thiserror::Error;

/// Errors surfaced by the contract bindings.
///
/// Every operation returns exactly one of these kinds to its caller. Nothing is retried or
/// suppressed inside the bindings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// Caller-supplied arguments do not match the ABI signature.
    #[error("encoding error: {0}")]
    Encoding(String),
    /// Returned or logged bytes do not match the expected ABI shape.
    #[error("decoding error: {0}")]
    Decoding(String),
    /// The backend is unreachable or the node answered with an error.
    #[error("rpc error: {0}")]
    Rpc(String),
    /// The node rejected a transaction before or during broadcast.
    #[error("submission error: {0}")]
    Submission(String),
    /// No usable signer, or the signer failed to produce a signature.
    #[error("signing error: {0}")]
    Signing(String),
}

impl BindingError {
    pub fn encoding(err: impl ToString) -> Self {
        Self::Encoding(err.to_string())
    }

    pub fn decoding(err: impl ToString) -> Self {
        Self::Decoding(err.to_string())
    }

    pub fn rpc(err: impl ToString) -> Self {
        Self::Rpc(err.to_string())
    }

    pub fn submission(err: impl ToString) -> Self {
        Self::Submission(err.to_string())
    }

    pub fn signing(err: impl ToString) -> Self {
        Self::Signing(err.to_string())
    }

    /// Whether a caller may reasonably retry the operation with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::Submission(_))
    }
}

pub type Result<T, E = BindingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(BindingError::rpc("connection refused").is_transient());
        assert!(BindingError::submission("nonce too low").is_transient());
        assert!(!BindingError::encoding("bad arg").is_transient());
        assert!(!BindingError::decoding("short buffer").is_transient());
        assert!(!BindingError::signing("no key").is_transient());
    }

    #[test]
    fn test_display_keeps_kind() {
        let err = BindingError::decoding("buffer overrun");
        assert_eq!(err.to_string(), "decoding error: buffer overrun");
    }
}
