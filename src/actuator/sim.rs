// Simulated actuator pair.
//
// The driver half stores the commanded speeds; the plant half integrates
// them into quadrature edges delivered through the real counter path, so a
// --sim run (and the tests) exercise the same closed loop as hardware:
// driver -> plant -> encoder edges -> shared counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use tokio::time::interval;

use super::driver::{Actuator, MotorDriver, clamp_speed};
use crate::config::CONTROL_PERIOD;
use crate::state::QuadratureCounter;

// Duty units per emitted tick per step. Unequal on purpose: the simulated
// pair drifts apart like a real pair with mismatched friction, which is
// what the spread compensation exists to contain.
const GAIN_A: i32 = 19_000;
const GAIN_B: i32 = 25_000;

#[derive(Debug, Default)]
struct SimCells {
    speed_a: AtomicI32,
    speed_b: AtomicI32,
}

/// Driver half, handed to the control loop.
pub struct SimActuators {
    cells: Arc<SimCells>,
}

/// Plant half: emits the encoder edges the commanded speeds would produce.
pub struct SimPlant {
    cells: Arc<SimCells>,
    counter_a: QuadratureCounter,
    counter_b: QuadratureCounter,
}

pub fn simulated_pair(
    counter_a: QuadratureCounter,
    counter_b: QuadratureCounter,
) -> (SimActuators, SimPlant) {
    let cells = Arc::new(SimCells::default());
    (
        SimActuators {
            cells: cells.clone(),
        },
        SimPlant {
            cells,
            counter_a,
            counter_b,
        },
    )
}

impl MotorDriver for SimActuators {
    fn drive(&mut self, actuator: Actuator, speed: i32) {
        let cell = match actuator {
            Actuator::A => &self.cells.speed_a,
            Actuator::B => &self.cells.speed_b,
        };
        cell.store(clamp_speed(speed), Ordering::Relaxed);
    }
}

impl SimPlant {
    /// Advance one step: emit the edges each actuator would have produced
    /// at its commanded speed.
    pub fn step(&self) {
        Self::emit(&self.counter_a, self.cells.speed_a.load(Ordering::Relaxed), GAIN_A);
        Self::emit(&self.counter_b, self.cells.speed_b.load(Ordering::Relaxed), GAIN_B);
    }

    fn emit(counter: &QuadratureCounter, speed: i32, gain: i32) {
        let ticks = speed / gain;
        // extension edges see the B phase low with the reference wiring
        for _ in 0..ticks.abs() {
            counter.on_rising_edge(ticks < 0);
        }
    }

    /// Free-running plant for `--sim` mode, stepping at the control rate.
    pub async fn run(self) {
        let mut tick = interval(CONTROL_PERIOD);
        loop {
            tick.tick().await;
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ControlState;

    fn pair() -> (SimActuators, SimPlant, Arc<ControlState>) {
        let state = ControlState::new();
        let (driver, plant) = simulated_pair(
            QuadratureCounter::new(state.clone(), Actuator::A),
            QuadratureCounter::new(state.clone(), Actuator::B),
        );
        (driver, plant, state)
    }

    #[test]
    fn commanded_speed_moves_the_counters() {
        let (mut driver, plant, state) = pair();

        driver.drive(Actuator::A, 63000);
        driver.drive(Actuator::B, -63000);
        for _ in 0..10 {
            plant.step();
        }

        // 63000/19000 = 3 edges per step up, 63000/25000 = 2 per step down
        assert_eq!(state.position(Actuator::A), 30);
        assert_eq!(state.position(Actuator::B), -20);
    }

    #[test]
    fn zero_speed_holds_position() {
        let (mut driver, plant, state) = pair();

        driver.drive(Actuator::A, 63000);
        plant.step();
        let held = state.position(Actuator::A);

        driver.drive(Actuator::A, 0);
        for _ in 0..50 {
            plant.step();
        }
        assert_eq!(state.position(Actuator::A), held);
    }

    #[test]
    fn oversized_commands_are_clamped() {
        let (mut driver, plant, state) = pair();

        driver.drive(Actuator::A, i32::MAX);
        plant.step();
        // clamped to 65535 duty -> 3 edges per step
        assert_eq!(state.position(Actuator::A), 3);
    }
}
