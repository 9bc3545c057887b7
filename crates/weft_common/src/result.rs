//! The internal error type for broken IR invariants.

/// Result alias for operations that can only fail on a broken invariant.
pub type InternalResult<T> = Result<T, InternalError>;

/// An internal consistency violation.
///
/// Raised when the IR graph is already inconsistent before a call: a rewrite
/// cannot find the node the edge sets say it references, a slice chain does
/// not lead back to the expected root, and so on. Never expected in correct
/// usage and not meant to be caught by ordinary callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal IR error: {message}")]
pub struct InternalError {
    /// Description of the violated invariant.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("target not found");
        assert_eq!(format!("{err}"), "internal IR error: target not found");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "slice has no parent".to_string().into();
        assert_eq!(err.message, "slice has no parent");
    }

    #[test]
    fn err_path() {
        let r: InternalResult<u32> = Err(InternalError::new("variable is null"));
        assert_eq!(r.unwrap_err().message, "variable is null");
    }
}
