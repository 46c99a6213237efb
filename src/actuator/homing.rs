// End-stop homing: drive the pair onto a mechanical limit, detect the
// stall, and rebase the tracked positions on the known geometry.
//
// Stall detection is encoder silence: while the pair moves, every poll
// sees fresh counts; one full poll interval with neither position changing
// means the hard stop has been reached. Runs in a foreground task and
// blocks only itself; the control loop keeps driving throughout.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::actuator::Actuator;
use crate::config::{HOMING_POLL, HOMING_TIMEOUT, SyncConfig};
use crate::messages::MotionCommand;
use crate::state::ControlState;

#[derive(Debug, thiserror::Error)]
pub enum HomingError {
    /// The pair was still producing encoder counts when the deadline hit,
    /// so no end-stop was ever reached. A jammed or free-spinning
    /// actuator shows up here instead of hanging the routine.
    #[error("no stall detected within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HomeDirection {
    Retract,
    Extend,
}

/// Drive both actuators fully in until they stall, then rebase both
/// positions to the retracted reference and hold.
pub async fn retract_home(
    state: &ControlState,
    cfg: &SyncConfig,
    identity: &str,
) -> Result<(), HomingError> {
    home(state, cfg, identity, HomeDirection::Retract).await
}

/// Drive both actuators fully out until they stall, then rebase both
/// positions to the extended reference and hold. "lift" pairs get the
/// extra geometry offset on actuator B.
pub async fn extend_home(
    state: &ControlState,
    cfg: &SyncConfig,
    identity: &str,
) -> Result<(), HomingError> {
    home(state, cfg, identity, HomeDirection::Extend).await
}

async fn home(
    state: &ControlState,
    cfg: &SyncConfig,
    identity: &str,
    direction: HomeDirection,
) -> Result<(), HomingError> {
    let drive = match direction {
        HomeDirection::Retract => MotionCommand::Retract,
        HomeDirection::Extend => MotionCommand::Extend,
    };
    drive.apply(state, cfg);
    info!(?direction, "homing started");

    let deadline = Instant::now() + HOMING_TIMEOUT;
    let mut last = (
        state.position(Actuator::A),
        state.position(Actuator::B),
    );
    loop {
        sleep(HOMING_POLL).await;
        let now = (
            state.position(Actuator::A),
            state.position(Actuator::B),
        );
        if now == last {
            break;
        }
        if Instant::now() >= deadline {
            MotionCommand::Stop.apply(state, cfg);
            warn!(?direction, "homing abandoned, pair still moving");
            return Err(HomingError::Timeout(HOMING_TIMEOUT));
        }
        last = now;
    }

    match direction {
        HomeDirection::Retract => {
            state.set_position(Actuator::A, cfg.home_retract_ticks);
            state.set_position(Actuator::B, cfg.home_retract_ticks);
        }
        HomeDirection::Extend => {
            state.set_position(Actuator::A, cfg.home_extend_ticks);
            state.set_position(Actuator::B, cfg.home_extend_ticks);
            if identity.contains("lift") {
                state.offset_position(Actuator::B, cfg.lift_offset_ticks);
            }
        }
    }
    MotionCommand::Stop.apply(state, cfg);
    info!(
        ?direction,
        pos_a = state.position(Actuator::A),
        pos_b = state.position(Actuator::B),
        "homing complete"
    );
    Ok(())
}
