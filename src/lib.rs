// Closed-loop position synchronizer for a dual linear actuator pair:
// encoder-tracked positions, a rate-matching control law, end-stop homing
// and settle-triggered position persistence.

pub mod actuator;
pub mod config;
pub mod console;
pub mod diagnostics;
pub mod messages;
pub mod runtime;
pub mod state;
pub mod store;
pub mod telemetry;

pub use actuator::{Actuator, MotorDriver, SyncController};
pub use config::SyncConfig;
pub use messages::MotionCommand;
pub use state::ControlState;
