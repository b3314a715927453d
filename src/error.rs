//! Session error types

use std::fmt;

/// Errors that can occur during session operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A lifecycle operation outside the recognized set was requested by name
    UnknownOperation(String),
    /// Attempt to assign a value directly into a segment slot
    NotWritable(String),
    /// The session store was established a second time
    AlreadyInitialized,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::UnknownOperation(name) => write!(f, "Unknown operation: {}", name),
            SessionError::NotWritable(name) => {
                write!(f, "Segment offsets are not writable ({})", name)
            }
            SessionError::AlreadyInitialized => write!(f, "Session store is already initialized"),
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            SessionError::UnknownOperation("foo".to_string()).to_string(),
            "Unknown operation: foo"
        );
        assert_eq!(
            SessionError::NotWritable("cart".to_string()).to_string(),
            "Segment offsets are not writable (cart)"
        );
        assert_eq!(
            SessionError::AlreadyInitialized.to_string(),
            "Session store is already initialized"
        );
    }
}
