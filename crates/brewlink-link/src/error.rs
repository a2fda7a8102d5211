use thiserror::Error;

/// Errors that can occur during link operations
#[derive(Debug, Error)]
pub enum LinkError {
    /// No channel is open
    #[error("Not connected to device")]
    NotConnected,

    /// `connect` called while a channel is already open
    #[error("Already connected")]
    AlreadyConnected,

    /// The channel could not be opened
    #[error("Failed to open {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    /// The read loop had ended; the stale connection was torn down
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Raw command with nothing but whitespace
    #[error("Refusing to send an empty command")]
    EmptyCommand,

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serial port enumeration or setup failure
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    pub fn open_failed(port: impl Into<String>, reason: impl ToString) -> Self {
        LinkError::OpenFailed {
            port: port.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failed_message() {
        let err = LinkError::open_failed("/dev/ttyUSB0", "permission denied");
        assert_eq!(
            err.to_string(),
            "Failed to open /dev/ttyUSB0: permission denied"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: LinkError = io.into();
        assert!(matches!(err, LinkError::Io(_)));
    }
}
