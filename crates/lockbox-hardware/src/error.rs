//! Error types for signal line operations.
//!
//! Raw line access is the narrowest hardware contract in the system. These
//! errors cover the two ways it can fail: the line went away, or the
//! driver reported a fault.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during signal line operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Line is not available or has been released.
    #[error("Line disconnected: {line}")]
    Disconnected { line: String },

    /// Driver reported a fault while reading or writing.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(line: impl Into<String>) -> Self {
        Self::Disconnected { line: line.into() }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("relay");
        assert!(matches!(error, HardwareError::Disconnected { .. }));
        assert_eq!(error.to_string(), "Line disconnected: relay");
    }

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("write rejected");
        assert!(matches!(error, HardwareError::CommunicationError { .. }));
        assert_eq!(error.to_string(), "Communication error: write rejected");
    }
}
