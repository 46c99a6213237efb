// Actuator pair control
//
// Provides:
// - the signed-speed motor driver contract and its GPIO / simulated backends
// - the synchronization control law
// - end-stop homing

pub mod driver;
#[cfg(target_os = "linux")]
pub mod gpio;
pub mod homing;
pub mod sim;
pub mod sync;

pub use driver::{Actuator, MotorDriver};
pub use homing::{HomingError, extend_home, retract_home};
pub use sync::{SyncController, TickOutput};
