// Periodic position + inertial readout.

use std::sync::Arc;

use tokio::time::interval;
use tracing::info;

use crate::actuator::Actuator;
use crate::config::TELEMETRY_PERIOD;
use crate::messages::TelemetryFrame;
use crate::state::ControlState;

/// Three-axis readings from the inertial sensor mounted next to the pair.
/// The real chip sits behind I2C; the runtime only cares about these two
/// calls.
pub trait InertialSensor: Send {
    /// m/s^2 per axis
    fn acceleration(&mut self) -> [f32; 3];
    /// rad/s per axis
    fn angular_rate(&mut self) -> [f32; 3];
}

/// Stand-in sensor for simulation runs: a chip at rest.
#[derive(Debug, Default)]
pub struct StaticImu;

impl InertialSensor for StaticImu {
    fn acceleration(&mut self) -> [f32; 3] {
        [0.0, -9.81, 0.0]
    }

    fn angular_rate(&mut self) -> [f32; 3] {
        [0.0; 3]
    }
}

/// Reads the sensor once per period and logs one line per frame. Runs
/// independently of (and much slower than) the control loop.
pub async fn telemetry_loop(state: Arc<ControlState>, mut imu: impl InertialSensor + 'static) {
    let mut tick = interval(TELEMETRY_PERIOD);
    loop {
        tick.tick().await;
        let frame = TelemetryFrame {
            pos_a: state.position(Actuator::A),
            pos_b: state.position(Actuator::B),
            accel: imu.acceleration(),
            gyro: imu.angular_rate(),
        };
        info!("{}", format_frame(&frame));
    }
}

/// `<pos_a> <pos_b>` followed by the six inertial readings to two decimals.
pub fn format_frame(frame: &TelemetryFrame) -> String {
    format!(
        "{} {} {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
        frame.pos_a,
        frame.pos_b,
        frame.accel[0],
        frame.accel[1],
        frame.accel[2],
        frame.gyro[0],
        frame.gyro[1],
        frame.gyro[2],
    )
}
