//! Simulated espresso machine.
//!
//! The machine runs on a simulation clock advanced explicitly with
//! [`EspressoMachine::advance`], so every reading is a pure function of the
//! elapsed time and the commands received. Sensor values drift on slow sine
//! waves around their set points; nothing is random.
//!
//! # Extraction cycle
//!
//! ```text
//! Idle ──start──> Preinfusion ──(preinfusion time)──> Extracting ──(extraction time)──> Finished
//!                      │                                   │                                │
//!                      └──────────────stop─────────────────┴──────────────stop──────> Finished
//! Finished ──start──> Preinfusion
//! ```
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use brewlink_emulator::{EspressoMachine, ExtractionState, MachineProfile};
//!
//! let mut machine = EspressoMachine::new(MachineProfile::default());
//! machine.start_extraction().unwrap();
//! assert_eq!(machine.state(), ExtractionState::Preinfusion);
//!
//! machine.advance(Duration::from_secs(60));
//! assert_eq!(machine.state(), ExtractionState::Finished);
//! assert!(machine.snapshot().liquid_weight > 30.0);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use brewlink_core::{Error, MachineStatus, Result};

/// Transitions kept for inspection.
const MAX_HISTORY_SIZE: usize = 32;

/// Phase of the current shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionState {
    Idle,
    /// Low-pressure soak before full pressure.
    Preinfusion,
    Extracting,
    /// Shot ended, by time or by a stop request.
    Finished,
}

impl ExtractionState {
    pub fn can_transition_to(&self, target: &ExtractionState) -> bool {
        matches!(
            (self, target),
            (ExtractionState::Idle | ExtractionState::Finished, ExtractionState::Preinfusion)
                | (ExtractionState::Preinfusion, ExtractionState::Extracting)
                | (
                    ExtractionState::Preinfusion | ExtractionState::Extracting,
                    ExtractionState::Finished
                )
        )
    }

    /// Value reported in the `current_stage` field.
    pub fn stage(&self) -> i64 {
        match self {
            ExtractionState::Idle => 0,
            ExtractionState::Preinfusion => 1,
            ExtractionState::Extracting => 2,
            ExtractionState::Finished => 3,
        }
    }

    /// True while water is flowing through the puck.
    pub fn is_brewing(&self) -> bool {
        matches!(self, ExtractionState::Preinfusion | ExtractionState::Extracting)
    }
}

impl fmt::Display for ExtractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionState::Idle => "Idle",
            ExtractionState::Preinfusion => "Preinfusion",
            ExtractionState::Extracting => "Extracting",
            ExtractionState::Finished => "Finished",
        };
        write!(f, "{name}")
    }
}

/// A recorded state change, stamped with simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: ExtractionState,
    pub to: ExtractionState,
    pub at: Duration,
}

/// Set points and timings of the simulated machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineProfile {
    pub firmware_version: String,
    pub brew_temperature: f64,
    pub steam_temperature: f64,
    #[serde(with = "millis")]
    pub preinfusion: Duration,
    #[serde(with = "millis")]
    pub extraction: Duration,
    /// Grams per second at full pressure.
    pub flow_rate: f64,
}

impl Default for MachineProfile {
    fn default() -> Self {
        Self {
            firmware_version: "FW2.1".to_string(),
            brew_temperature: 93.0,
            steam_temperature: 125.0,
            preinfusion: Duration::from_secs(5),
            extraction: Duration::from_secs(25),
            flow_rate: 1.6,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// The simulated controller's process state.
#[derive(Debug, Clone)]
pub struct EspressoMachine {
    profile: MachineProfile,
    state: ExtractionState,
    clock: Duration,
    state_entered_at: Duration,
    shot_weight: f64,
    history: VecDeque<StateTransition>,
}

impl EspressoMachine {
    pub fn new(profile: MachineProfile) -> Self {
        Self {
            profile,
            state: ExtractionState::Idle,
            clock: Duration::ZERO,
            state_entered_at: Duration::ZERO,
            shot_weight: 0.0,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn profile(&self) -> &MachineProfile {
        &self.profile
    }

    pub fn state(&self) -> ExtractionState {
        self.state
    }

    /// Simulation time since power-on.
    pub fn uptime(&self) -> Duration {
        self.clock
    }

    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Begin a shot. Valid from `Idle` or `Finished`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidStateTransition` while a shot is already running.
    pub fn start_extraction(&mut self) -> Result<StateTransition> {
        let transition = self.transition_to(ExtractionState::Preinfusion)?;
        self.shot_weight = 0.0;
        Ok(transition)
    }

    /// End the running shot early.
    ///
    /// # Errors
    ///
    /// `Error::InvalidStateTransition` when no shot is running.
    pub fn stop_extraction(&mut self) -> Result<StateTransition> {
        self.transition_to(ExtractionState::Finished)
    }

    /// Run the simulation forward by `elapsed`, applying timed transitions
    /// at the moment they fall due.
    pub fn advance(&mut self, elapsed: Duration) {
        let target = self.clock + elapsed;

        while self.clock < target {
            let deadline = match self.state {
                ExtractionState::Preinfusion => Some(self.state_entered_at + self.profile.preinfusion),
                ExtractionState::Extracting => Some(self.state_entered_at + self.profile.extraction),
                _ => None,
            };

            let step_end = deadline.map_or(target, |deadline| deadline.min(target));
            let step = step_end.saturating_sub(self.clock);
            self.accumulate(step);
            self.clock = step_end;

            if deadline.is_some_and(|deadline| deadline <= self.clock) {
                let next = match self.state {
                    ExtractionState::Preinfusion => ExtractionState::Extracting,
                    _ => ExtractionState::Finished,
                };
                // Both timed edges are in the transition table.
                let _ = self.transition_to(next);
            }
        }
    }

    /// Current sensor readings.
    pub fn snapshot(&self) -> MachineStatus {
        let t = self.clock.as_secs_f64();
        let brewing = self.state.is_brewing();
        let full_pressure = self.state == ExtractionState::Extracting;

        let flow_rate = match self.state {
            ExtractionState::Preinfusion => self.profile.flow_rate * 0.25,
            ExtractionState::Extracting => self.profile.flow_rate + 0.1 * (t * 1.3).sin(),
            _ => 0.0,
        };

        MachineStatus {
            error_code: 0,
            flow_rate: tenths(flow_rate),
            brew_boiler_pressure: tenths(1.2 + 0.05 * (t * 0.4).sin()),
            brew_boiler_temperature: tenths(self.profile.brew_temperature + 0.4 * (t * 0.5).sin()),
            brew_head_temperature: tenths(self.profile.brew_temperature - 5.0 + 0.3 * (t * 0.3).sin()),
            brew_pressure_level: if full_pressure { 9 } else if brewing { 3 } else { 0 },
            brew_boiler_water_level: 1,
            steam_run_status: 0,
            steam_boiler_pressure: tenths(1.4 + 0.05 * (t * 0.2).sin()),
            steam_boiler_temperature: tenths(self.profile.steam_temperature + (t * 0.25).sin()),
            steam_milk_temperature: 0.0,
            steam_pressure_level: 1,
            hot_water_run_status: 0,
            hot_water_percent_level: 80,
            hot_water_temperature: tenths(85.0 + 0.5 * (t * 0.1).sin()),
            tray_position_state: 1,
            brew_handle_position_state: 1,
            hot_switch_position_state: 0,
            tray_high_level_state: 0,
            tray_low_level_state_1: 1,
            tray_low_level_state_2: 0,
            current_stage: self.state.stage(),
            total_stage: 3,
            drink_making_flag: i64::from(brewing),
            liquid_adc: (self.shot_weight * 20.0).round() as i64,
            liquid_weight: tenths(self.shot_weight),
            firmware_version: self.profile.firmware_version.clone(),
        }
    }

    fn accumulate(&mut self, step: Duration) {
        let secs = step.as_secs_f64();
        match self.state {
            ExtractionState::Preinfusion => self.shot_weight += self.profile.flow_rate * 0.25 * secs,
            ExtractionState::Extracting => self.shot_weight += self.profile.flow_rate * secs,
            _ => {}
        }
    }

    fn transition_to(&mut self, next: ExtractionState) -> Result<StateTransition> {
        if !self.state.can_transition_to(&next) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        let transition = StateTransition {
            from: self.state,
            to: next,
            at: self.clock,
        };
        debug!(from = %transition.from, to = %transition.to, "Extraction state changed");

        self.state = next;
        self.state_entered_at = self.clock;
        if self.history.len() == MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(transition);
        Ok(transition)
    }
}

fn tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
