// Loop timing, ports, and control-law tuning
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

// Synchronization control loop period
pub const CONTROL_PERIOD: Duration = Duration::from_millis(10);

// Telemetry print period; slower than the control loop so it cannot starve it
pub const TELEMETRY_PERIOD: Duration = Duration::from_millis(250);

// Homing samples both positions once per poll; a poll with no motion means
// the mechanical end-stop has been reached
pub const HOMING_POLL: Duration = Duration::from_millis(200);
pub const HOMING_TIMEOUT: Duration = Duration::from_secs(30);

// Diagnostics echo listener
pub const DIAG_PORT: u16 = 30600;

// Default path of the persisted position record
pub const STATE_FILE: &str = "info.txt";

/// PWM resolution. Speed commands span `-PWM_MAX..=PWM_MAX`.
pub const PWM_MAX: i32 = 65535;

/// Tunables of the synchronization law.
///
/// All positions and margins are in encoder ticks, all speeds in PWM duty
/// units out of [`PWM_MAX`]. A JSON tuning file may override any subset of
/// the fields; the rest keep the reference values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Nominal travel speed.
    pub full_speed: i32,
    /// Speed of the leading actuator while the lagging one closes the gap.
    pub yield_speed: i32,
    /// Half-width of the on-target window around the shared target.
    pub dead_band: i64,
    /// Lead tolerated while extending before the leader yields.
    pub extend_spread: i64,
    /// Lead tolerated while retracting before the leader yields.
    /// Larger than the extend margin: backlash makes retraction sloppier.
    pub retract_spread: i64,
    /// Position assigned to both actuators after a retract home.
    pub home_retract_ticks: i64,
    /// Position assigned to both actuators after an extend home.
    pub home_extend_ticks: i64,
    /// Extra ticks on actuator B after extend-homing a "lift" pair, to
    /// compensate the asymmetric mount geometry on that assembly.
    pub lift_offset_ticks: i64,
    /// Pseudo-target for continuous extend/retract: far beyond any
    /// reachable position, so the pair drives until stopped or homed.
    pub travel_limit: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            full_speed: 63000,
            yield_speed: 55000,
            dead_band: 10,
            extend_spread: 5,
            retract_spread: 10,
            home_retract_ticks: 0,
            home_extend_ticks: 4500,
            lift_offset_ticks: 50,
            travel_limit: 1_000_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning file: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SyncConfig {
    /// Load a JSON tuning file. Missing fields fall back to the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_tuning_file_keeps_defaults() {
        let cfg: SyncConfig =
            serde_json::from_str(r#"{"dead_band": 4, "full_speed": 40000}"#).unwrap();
        assert_eq!(cfg.dead_band, 4);
        assert_eq!(cfg.full_speed, 40000);
        assert_eq!(cfg.yield_speed, SyncConfig::default().yield_speed);
        assert_eq!(cfg.home_extend_ticks, 4500);
    }

    #[test]
    fn empty_tuning_file_is_the_reference_tuning() {
        let cfg: SyncConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.extend_spread, 5);
        assert_eq!(cfg.retract_spread, 10);
        assert_eq!(cfg.travel_limit, 1_000_000);
    }
}
