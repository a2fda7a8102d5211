use crate::constants::{FIELD_SEPARATOR, NUMERIC_FIELD_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One decoded telemetry snapshot from the espresso controller.
///
/// Built exactly once per status frame and handed by value to whoever
/// consumes it. Fields appear here in wire order. Any numeric field whose
/// token failed to parse holds `0`; `firmware_version` is empty when the
/// frame carried none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineStatus {
    pub error_code: i64,
    pub flow_rate: f64,
    pub brew_boiler_pressure: f64,
    pub brew_boiler_temperature: f64,
    pub brew_head_temperature: f64,
    pub brew_pressure_level: i64,
    pub brew_boiler_water_level: i64,
    pub steam_run_status: i64,
    pub steam_boiler_pressure: f64,
    pub steam_boiler_temperature: f64,
    pub steam_milk_temperature: f64,
    pub steam_pressure_level: i64,
    pub hot_water_run_status: i64,
    pub hot_water_percent_level: i64,
    pub hot_water_temperature: f64,
    pub tray_position_state: i64,
    pub brew_handle_position_state: i64,
    pub hot_switch_position_state: i64,
    pub tray_high_level_state: i64,
    pub tray_low_level_state_1: i64,
    pub tray_low_level_state_2: i64,
    pub current_stage: i64,
    pub total_stage: i64,
    pub drink_making_flag: i64,
    pub liquid_adc: i64,
    pub liquid_weight: f64,
    pub firmware_version: String,
}

/// Whether a status slot is decoded as an integer or a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
}

impl MachineStatus {
    /// Field names in wire order.
    pub const FIELD_NAMES: [&'static str; 27] = [
        "error_code",
        "flow_rate",
        "brew_boiler_pressure",
        "brew_boiler_temperature",
        "brew_head_temperature",
        "brew_pressure_level",
        "brew_boiler_water_level",
        "steam_run_status",
        "steam_boiler_pressure",
        "steam_boiler_temperature",
        "steam_milk_temperature",
        "steam_pressure_level",
        "hot_water_run_status",
        "hot_water_percent_level",
        "hot_water_temperature",
        "tray_position_state",
        "brew_handle_position_state",
        "hot_switch_position_state",
        "tray_high_level_state",
        "tray_low_level_state_1",
        "tray_low_level_state_2",
        "current_stage",
        "total_stage",
        "drink_making_flag",
        "liquid_adc",
        "liquid_weight",
        "firmware_version",
    ];

    /// Decoding kind of each slot, in wire order.
    pub const FIELD_KINDS: [FieldKind; 27] = {
        use FieldKind::{Float as F, Integer as I, Text as T};
        [
            I, F, F, F, F, I, I, I, F, F, F, I, I, I, F, I, I, I, I, I, I, I, I, I, I, F, T,
        ]
    };

    /// The 26 numeric slots as `f64`, in wire order.
    ///
    /// ```
    /// use brewlink_core::MachineStatus;
    ///
    /// let status = MachineStatus { flow_rate: 2.5, ..Default::default() };
    /// assert_eq!(status.numeric_values()[1], 2.5);
    /// ```
    #[must_use]
    pub fn numeric_values(&self) -> [f64; NUMERIC_FIELD_COUNT] {
        [
            self.error_code as f64,
            self.flow_rate,
            self.brew_boiler_pressure,
            self.brew_boiler_temperature,
            self.brew_head_temperature,
            self.brew_pressure_level as f64,
            self.brew_boiler_water_level as f64,
            self.steam_run_status as f64,
            self.steam_boiler_pressure,
            self.steam_boiler_temperature,
            self.steam_milk_temperature,
            self.steam_pressure_level as f64,
            self.hot_water_run_status as f64,
            self.hot_water_percent_level as f64,
            self.hot_water_temperature,
            self.tray_position_state as f64,
            self.brew_handle_position_state as f64,
            self.hot_switch_position_state as f64,
            self.tray_high_level_state as f64,
            self.tray_low_level_state_1 as f64,
            self.tray_low_level_state_2 as f64,
            self.current_stage as f64,
            self.total_stage as f64,
            self.drink_making_flag as f64,
            self.liquid_adc as f64,
            self.liquid_weight,
        ]
    }

    /// Render the payload part of a status frame (no marker, no terminator).
    ///
    /// Decoding the result yields a status equal to `self`.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let numeric = self.numeric_values();
        let mut out = String::with_capacity(160);
        for (index, value) in numeric.iter().enumerate() {
            if index > 0 {
                out.push(FIELD_SEPARATOR);
            }
            match Self::FIELD_KINDS[index] {
                FieldKind::Integer => out.push_str(&(*value as i64).to_string()),
                _ => out.push_str(&value.to_string()),
            }
        }
        out.push(FIELD_SEPARATOR);
        out.push_str(&self.firmware_version);
        out
    }

    /// True while the controller reports a drink in progress.
    #[must_use]
    pub fn is_extracting(&self) -> bool {
        self.drink_making_flag != 0
    }

    /// True when the controller reports a non-zero error code.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error_code != 0
    }
}

/// Lifecycle of the serial link, owned by the connection controller.
///
/// ```text
/// Disconnected -> Connecting -> Connected { reading } -> Disconnecting -> Disconnected
///                     |
///                     +-- open failed --> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Channel open. `reading` is false once the read loop has ended on its own.
    Connected { reading: bool },
    Disconnecting,
}

impl ConnectionState {
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected { reading: true } => write!(f, "Connected"),
            ConnectionState::Connected { reading: false } => write!(f, "Connected (read stopped)"),
            ConnectionState::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample() -> MachineStatus {
        MachineStatus {
            flow_rate: 1.5,
            brew_boiler_pressure: 9.2,
            brew_boiler_temperature: 93.4,
            current_stage: 2,
            total_stage: 3,
            drink_making_flag: 1,
            liquid_adc: 512,
            liquid_weight: 18.25,
            firmware_version: "V1.2.3".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_field_tables_agree() {
        assert_eq!(MachineStatus::FIELD_NAMES.len(), MachineStatus::FIELD_KINDS.len());
        assert_eq!(MachineStatus::FIELD_KINDS[26], FieldKind::Text);
        assert_eq!(
            MachineStatus::FIELD_KINDS
                .iter()
                .filter(|kind| **kind != FieldKind::Text)
                .count(),
            NUMERIC_FIELD_COUNT
        );
    }

    #[test]
    fn test_to_csv_layout() {
        let csv = sample().to_csv();
        let fields: Vec<&str> = csv.split(',').collect();

        assert_eq!(fields.len(), 27);
        assert_eq!(fields[0], "0");
        assert_eq!(fields[1], "1.5");
        assert_eq!(fields[3], "93.4");
        assert_eq!(fields[24], "512");
        assert_eq!(fields[25], "18.25");
        assert_eq!(fields[26], "V1.2.3");
    }

    #[test]
    fn test_default_is_zeroed() {
        let status = MachineStatus::default();
        assert!(status.numeric_values().iter().all(|v| *v == 0.0));
        assert!(status.firmware_version.is_empty());
        assert!(!status.is_extracting());
        assert!(!status.has_error());
    }

    #[test]
    fn test_serde_uses_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        for name in MachineStatus::FIELD_NAMES {
            assert!(json.get(name).is_some(), "missing {name}");
        }
    }

    #[rstest]
    #[case(ConnectionState::Disconnected, false, "Disconnected")]
    #[case(ConnectionState::Connecting, false, "Connecting")]
    #[case(ConnectionState::Connected { reading: true }, true, "Connected")]
    #[case(ConnectionState::Connected { reading: false }, true, "Connected (read stopped)")]
    #[case(ConnectionState::Disconnecting, false, "Disconnecting")]
    fn test_connection_state(
        #[case] state: ConnectionState,
        #[case] connected: bool,
        #[case] display: &str,
    ) {
        assert_eq!(state.is_connected(), connected);
        assert_eq!(state.to_string(), display);
    }
}
