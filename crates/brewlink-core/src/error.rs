use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("Expected at least {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    // Emulator errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::FieldCount {
            expected: 27,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Expected at least 27 fields, got 3");

        let err = Error::FrameTooLarge {
            size: 5000,
            max: 4096,
        };
        assert_eq!(err.to_string(), "Frame too large: 5000 bytes (max 4096)");
    }
}
