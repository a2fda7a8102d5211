//! Serial port channel.
//!
//! [`SerialChannel`] opens a UART (USB CDC/FTDI bridge or native port)
//! through `tokio-serial`. Port discovery goes through `serialport`, which
//! also supplies the USB identity shown as the device info string.

use tokio::io::AsyncWriteExt;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, warn};

use brewlink_core::constants::GENERIC_DEVICE_INFO;

use crate::channel::Channel;
use crate::config::SerialSettings;
use crate::error::LinkError;

/// A serial port visible on this machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    /// `VID:xxxx PID:xxxx` for USB ports, otherwise the generic label.
    pub device_info: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl PortInfo {
    fn from_serialport(port: &serialport::SerialPortInfo) -> Self {
        match &port.port_type {
            serialport::SerialPortType::UsbPort(usb) => Self {
                name: port.port_name.clone(),
                device_info: usb_device_info(usb.vid, usb.pid),
                manufacturer: usb.manufacturer.clone(),
                product: usb.product.clone(),
            },
            _ => Self {
                name: port.port_name.clone(),
                device_info: GENERIC_DEVICE_INFO.to_string(),
                manufacturer: None,
                product: None,
            },
        }
    }

    pub fn is_usb(&self) -> bool {
        self.device_info != GENERIC_DEVICE_INFO
    }
}

/// Format a USB identity as four-digit lowercase hex.
pub fn usb_device_info(vid: u16, pid: u16) -> String {
    format!("VID:{vid:04x} PID:{pid:04x}")
}

/// List serial ports, USB ports first, then by name.
pub fn list_ports() -> Result<Vec<PortInfo>, LinkError> {
    let ports = serialport::available_ports().map_err(|e| {
        error!(error = %e, "Failed to enumerate serial ports");
        LinkError::Serial(e)
    })?;

    let mut infos: Vec<PortInfo> = ports.iter().map(PortInfo::from_serialport).collect();
    infos.sort_by(|a, b| b.is_usb().cmp(&a.is_usb()).then_with(|| a.name.cmp(&b.name)));
    debug!(count = infos.len(), "Enumerated serial ports");
    Ok(infos)
}

/// Channel over a local serial port.
#[derive(Debug, Clone)]
pub struct SerialChannel {
    port: String,
    settings: SerialSettings,
}

impl SerialChannel {
    pub fn new(port: impl Into<String>, settings: SerialSettings) -> Self {
        Self {
            port: port.into(),
            settings,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

impl Channel for SerialChannel {
    type Stream = SerialStream;

    async fn open(&mut self) -> Result<SerialStream, LinkError> {
        debug!(
            port = %self.port,
            baud_rate = self.settings.baud_rate,
            format = %self.settings.frame_format(),
            flow_control = self.settings.flow_control,
            "Opening serial port"
        );

        let stream = tokio_serial::new(&self.port, self.settings.baud_rate)
            .data_bits(self.settings.tokio_data_bits()?)
            .stop_bits(self.settings.tokio_stop_bits()?)
            .parity(self.settings.parity.into())
            .flow_control(self.settings.tokio_flow_control())
            .open_native_async()
            .map_err(|e| {
                error!(port = %self.port, error = %e, "Failed to open serial port");
                LinkError::open_failed(&self.port, e)
            })?;

        info!(port = %self.port, baud_rate = self.settings.baud_rate, "Serial port opened");
        Ok(stream)
    }

    async fn close(&mut self, stream: Option<SerialStream>) -> Result<(), LinkError> {
        let Some(mut stream) = stream else {
            debug!(port = %self.port, "Serial stream already dropped");
            return Ok(());
        };

        if let Err(e) = stream.shutdown().await {
            warn!(port = %self.port, error = %e, "Error flushing serial port during close");
        }
        drop(stream);

        debug!(port = %self.port, "Serial port closed");
        Ok(())
    }

    fn device_info(&self) -> String {
        match serialport::available_ports() {
            Ok(ports) => ports
                .iter()
                .find(|port| port.port_name == self.port)
                .map(|port| PortInfo::from_serialport(port).device_info)
                .unwrap_or_else(|| GENERIC_DEVICE_INFO.to_string()),
            Err(e) => {
                debug!(error = %e, "Port lookup failed, reporting generic device");
                GENERIC_DEVICE_INFO.to_string()
            }
        }
    }
}
