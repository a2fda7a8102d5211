//! Positional decoding of a status payload into a [`MachineStatus`].

use brewlink_core::constants::{FIELD_SEPARATOR, STATUS_FIELD_COUNT};
use brewlink_core::{Error, MachineStatus, Result};

use crate::field::{parse_float, parse_int};

/// Decoder for the CSV payload found between the status marker and `#`.
///
/// # Example
///
/// ```
/// use brewlink_protocol::StatusParser;
///
/// let payload = "0,1.5,9,93,92,1,1,0,1.2,120,60,1,0,50,85,1,1,0,0,0,0,2,3,1,512,18.5,V1.0";
/// let status = StatusParser::parse(payload).unwrap();
///
/// assert_eq!(status.flow_rate, 1.5);
/// assert_eq!(status.liquid_adc, 512);
/// assert_eq!(status.firmware_version, "V1.0");
/// ```
pub struct StatusParser;

impl StatusParser {
    /// Decode a payload.
    ///
    /// Fields are trimmed and decoded permissively: a token that does not
    /// start with a number yields `0` for its slot. Fields past the 27th are
    /// ignored.
    ///
    /// # Errors
    /// Returns `Error::FieldCount` if the payload has fewer than 27 fields.
    pub fn parse(payload: &str) -> Result<MachineStatus> {
        let fields: Vec<&str> = payload.split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() < STATUS_FIELD_COUNT {
            return Err(Error::FieldCount {
                expected: STATUS_FIELD_COUNT,
                actual: fields.len(),
            });
        }

        let int = |index: usize| parse_int(fields[index]);
        let float = |index: usize| parse_float(fields[index]);

        Ok(MachineStatus {
            error_code: int(0),
            flow_rate: float(1),
            brew_boiler_pressure: float(2),
            brew_boiler_temperature: float(3),
            brew_head_temperature: float(4),
            brew_pressure_level: int(5),
            brew_boiler_water_level: int(6),
            steam_run_status: int(7),
            steam_boiler_pressure: float(8),
            steam_boiler_temperature: float(9),
            steam_milk_temperature: float(10),
            steam_pressure_level: int(11),
            hot_water_run_status: int(12),
            hot_water_percent_level: int(13),
            hot_water_temperature: float(14),
            tray_position_state: int(15),
            brew_handle_position_state: int(16),
            hot_switch_position_state: int(17),
            tray_high_level_state: int(18),
            tray_low_level_state_1: int(19),
            tray_low_level_state_2: int(20),
            current_stage: int(21),
            total_stage: int(22),
            drink_making_flag: int(23),
            liquid_adc: int(24),
            liquid_weight: float(25),
            firmware_version: fields[26].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str =
        "0,1.5,9.1,93.2,92.8,1,1,0,1.2,120.5,60.1,1,0,50,85.5,1,1,0,0,0,0,2,3,1,512,18.5,V1.0";

    #[test]
    fn test_parse_complete_payload() {
        let status = StatusParser::parse(PAYLOAD).unwrap();

        assert_eq!(status.error_code, 0);
        assert_eq!(status.brew_boiler_pressure, 9.1);
        assert_eq!(status.steam_boiler_temperature, 120.5);
        assert_eq!(status.hot_water_percent_level, 50);
        assert_eq!(status.current_stage, 2);
        assert_eq!(status.total_stage, 3);
        assert_eq!(status.drink_making_flag, 1);
        assert_eq!(status.liquid_weight, 18.5);
        assert_eq!(status.firmware_version, "V1.0");
    }

    #[test]
    fn test_fields_are_trimmed() {
        let spaced = PAYLOAD.replace(',', " , ");
        assert_eq!(StatusParser::parse(&spaced).unwrap(), StatusParser::parse(PAYLOAD).unwrap());
    }

    #[test]
    fn test_bad_token_zeroes_only_its_slot() {
        let broken = PAYLOAD.replacen("93.2", "oops", 1);
        let status = StatusParser::parse(&broken).unwrap();

        assert_eq!(status.brew_boiler_temperature, 0.0);
        assert_eq!(status.brew_head_temperature, 92.8);
        assert_eq!(status.brew_boiler_pressure, 9.1);
    }

    #[test]
    fn test_too_few_fields() {
        let result = StatusParser::parse("1,2,3");
        assert!(matches!(
            result,
            Err(Error::FieldCount {
                expected: 27,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let extended = format!("{PAYLOAD},extra,fields");
        let status = StatusParser::parse(&extended).unwrap();
        assert_eq!(status.firmware_version, "V1.0");
    }

    #[test]
    fn test_empty_firmware_slot() {
        let payload = PAYLOAD.trim_end_matches("V1.0");
        let status = StatusParser::parse(payload).unwrap();
        assert_eq!(status.firmware_version, "");
    }
}
