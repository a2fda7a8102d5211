//! Link configuration.
//!
//! Every setting has a default matching the controller's factory setup, so
//! an empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//!
//! [serial]
//! baud_rate = 115200
//! data_bits = 8
//! stop_bits = 1
//! parity = "none"
//! flow_control = false
//!
//! [poll]
//! auto_poll = true
//! interval_ms = 200
//!
//! [buffers]
//! parse_max_chars = 10000
//! parse_retain_chars = 1000
//! log_max_chars = 2000
//! read_chunk_size = 4096
//! ```

use std::path::Path;
use std::time::Duration;

use brewlink_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_DATA_BITS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_STOP_BITS,
    LOG_BUFFER_MAX_CHARS, PARSE_BUFFER_MAX_CHARS, PARSE_BUFFER_RETAIN_CHARS, READ_CHUNK_SIZE,
};
use brewlink_protocol::BufferLimits;
use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Top-level link configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port path (`/dev/ttyUSB0`, `COM3`). Required for serial links.
    pub port: Option<String>,
    pub serial: SerialSettings,
    pub poll: PollSettings,
    pub buffers: BufferSettings,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// UART line settings. Defaults to 115200 8N1, no flow control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    /// RTS/CTS hardware flow control.
    pub flow_control: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DEFAULT_DATA_BITS,
            stop_bits: DEFAULT_STOP_BITS,
            parity: Parity::None,
            flow_control: false,
        }
    }
}

impl SerialSettings {
    pub fn tokio_data_bits(&self) -> Result<tokio_serial::DataBits, LinkError> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            other => Err(LinkError::Config(format!(
                "data_bits must be 5-8, got {other}"
            ))),
        }
    }

    pub fn tokio_stop_bits(&self) -> Result<tokio_serial::StopBits, LinkError> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            other => Err(LinkError::Config(format!(
                "stop_bits must be 1 or 2, got {other}"
            ))),
        }
    }

    pub fn tokio_flow_control(&self) -> tokio_serial::FlowControl {
        if self.flow_control {
            tokio_serial::FlowControl::Hardware
        } else {
            tokio_serial::FlowControl::None
        }
    }

    /// Short form like `8N1` for log lines.
    pub fn frame_format(&self) -> String {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        format!("{}{}{}", self.data_bits, parity, self.stop_bits)
    }
}

/// Telemetry polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Whether polling starts automatically on connect.
    pub auto_poll: bool,
    pub interval_ms: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            auto_poll: true,
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PollSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Buffer thresholds for the read path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferSettings {
    pub parse_max_chars: usize,
    pub parse_retain_chars: usize,
    pub log_max_chars: usize,
    pub read_chunk_size: usize,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            parse_max_chars: PARSE_BUFFER_MAX_CHARS,
            parse_retain_chars: PARSE_BUFFER_RETAIN_CHARS,
            log_max_chars: LOG_BUFFER_MAX_CHARS,
            read_chunk_size: READ_CHUNK_SIZE,
        }
    }
}

impl BufferSettings {
    pub fn parse_limits(&self) -> BufferLimits {
        BufferLimits {
            max_chars: self.parse_max_chars,
            retain_chars: self.parse_retain_chars,
        }
    }
}

impl LinkConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, LinkError> {
        let config: LinkConfig =
            toml::from_str(text).map_err(|e| LinkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LinkError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LinkError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String, LinkError> {
        toml::to_string_pretty(self).map_err(|e| LinkError::Config(e.to_string()))
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), LinkError> {
        self.serial.tokio_data_bits()?;
        self.serial.tokio_stop_bits()?;

        if self.serial.baud_rate == 0 {
            return Err(LinkError::Config("baud_rate must be positive".into()));
        }
        if self.poll.interval_ms == 0 {
            return Err(LinkError::Config("poll interval must be positive".into()));
        }
        if self.buffers.parse_retain_chars >= self.buffers.parse_max_chars {
            return Err(LinkError::Config(format!(
                "parse_retain_chars ({}) must be below parse_max_chars ({})",
                self.buffers.parse_retain_chars, self.buffers.parse_max_chars
            )));
        }
        if self.buffers.log_max_chars == 0 || self.buffers.read_chunk_size == 0 {
            return Err(LinkError::Config(
                "log_max_chars and read_chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = LinkConfig::from_toml_str("").unwrap();
        assert_eq!(config, LinkConfig::default());
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.frame_format(), "8N1");
        assert!(config.poll.auto_poll);
        assert_eq!(config.poll.interval(), Duration::from_millis(200));
        assert_eq!(config.buffers.parse_limits(), BufferLimits::default());
    }

    #[test]
    fn test_partial_document() {
        let config = LinkConfig::from_toml_str(
            r#"
            port = "/dev/ttyACM0"

            [poll]
            auto_poll = false
            "#,
        )
        .unwrap();

        assert_eq!(config.port.as_deref(), Some("/dev/ttyACM0"));
        assert!(!config.poll.auto_poll);
        assert_eq!(config.poll.interval_ms, 200);
        assert_eq!(config.serial, SerialSettings::default());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = LinkConfig::default();
        config.port = Some("COM3".into());
        config.serial.parity = Parity::Even;

        let text = config.to_toml_string().unwrap();
        assert!(text.contains("parity = \"even\""));
        assert_eq!(LinkConfig::from_toml_str(&text).unwrap(), config);
    }

    #[rstest]
    #[case("[serial]\ndata_bits = 9")]
    #[case("[serial]\nstop_bits = 3")]
    #[case("[serial]\nbaud_rate = 0")]
    #[case("[poll]\ninterval_ms = 0")]
    #[case("[buffers]\nparse_max_chars = 100\nparse_retain_chars = 100")]
    #[case("[buffers]\nread_chunk_size = 0")]
    #[case("port = 5")]
    fn test_invalid_documents(#[case] text: &str) {
        assert!(matches!(
            LinkConfig::from_toml_str(text),
            Err(LinkError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = LinkConfig::load("/nonexistent/brewlink.toml");
        assert!(matches!(result, Err(LinkError::Config(_))));
    }
}
