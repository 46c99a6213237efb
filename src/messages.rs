// Command and telemetry types for the runtime

use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::state::ControlState;

/// Motion commands accepted by the command plane.
///
/// There is no queueing: each command overwrites the shared target (or the
/// active flag) and the control loop picks the result up on its next tick,
/// so concurrent commands are last-write-wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionCommand {
    /// Move both actuators to an absolute tick count.
    SetTarget(i64),
    /// Drive out until stopped or mechanically limited.
    Extend,
    /// Drive in until stopped or mechanically limited.
    Retract,
    /// Freeze in place: the target becomes the current midpoint.
    Stop,
    /// `false` forces zero output on the next tick regardless of target.
    Activate(bool),
}

impl MotionCommand {
    /// Apply to the shared state. Called only from the command plane.
    pub fn apply(self, state: &ControlState, cfg: &SyncConfig) {
        match self {
            MotionCommand::SetTarget(ticks) => state.set_target(ticks),
            MotionCommand::Extend => state.set_target(cfg.travel_limit),
            MotionCommand::Retract => state.set_target(-cfg.travel_limit),
            MotionCommand::Stop => state.set_target(state.midpoint()),
            MotionCommand::Activate(on) => state.set_active(on),
        }
    }
}

/// Requests arriving from the operator console.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleRequest {
    Motion(MotionCommand),
    RetractHome,
    ExtendHome,
    PrintPositions,
    Quit,
}

/// One telemetry sample: tracked positions plus inertial readings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct TelemetryFrame {
    pub pos_a: i64,
    pub pos_b: i64,
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::Actuator;

    #[test]
    fn stop_freezes_at_the_midpoint() {
        let cfg = SyncConfig::default();
        let state = ControlState::new();
        state.set_position(Actuator::A, 120);
        state.set_position(Actuator::B, 80);

        MotionCommand::Stop.apply(&state, &cfg);
        assert_eq!(state.target(), 100);
    }

    #[test]
    fn extend_and_retract_saturate_the_target() {
        let cfg = SyncConfig::default();
        let state = ControlState::new();

        MotionCommand::Extend.apply(&state, &cfg);
        assert_eq!(state.target(), cfg.travel_limit);

        MotionCommand::Retract.apply(&state, &cfg);
        assert_eq!(state.target(), -cfg.travel_limit);
    }

    #[test]
    fn activate_toggles_the_flag() {
        let cfg = SyncConfig::default();
        let state = ControlState::new();
        MotionCommand::Activate(true).apply(&state, &cfg);
        assert!(state.active());
        MotionCommand::Activate(false).apply(&state, &cfg);
        assert!(!state.active());
    }
}
