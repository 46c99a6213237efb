// Shared control state: encoder counters, target, active flag.
//
// The position counters are the only fields written from interrupt context
// (the encoder edge callbacks). Target and active flag are written only by
// the command plane and read by the control loop, so plain relaxed atomics
// cover every access without a lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::actuator::Actuator;

#[derive(Debug, Default)]
pub struct ControlState {
    pos_a: AtomicI64,
    pos_b: AtomicI64,
    target: AtomicI64,
    // pair is de-energized until someone activates it
    active: AtomicBool,
}

/// One consistent per-tick view of the state. Every field is read exactly
/// once at tick start; both actuators' decisions within a tick come from
/// the same snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub pos_a: i64,
    pub pos_b: i64,
    pub target: i64,
    pub active: bool,
}

impl ControlState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn cell(&self, actuator: Actuator) -> &AtomicI64 {
        match actuator {
            Actuator::A => &self.pos_a,
            Actuator::B => &self.pos_b,
        }
    }

    pub fn position(&self, actuator: Actuator) -> i64 {
        self.cell(actuator).load(Ordering::Relaxed)
    }

    /// Direct assignment is reserved for homing resets and the startup
    /// seed from the persisted record; everything else goes through the
    /// per-edge counters.
    pub fn set_position(&self, actuator: Actuator, ticks: i64) {
        self.cell(actuator).store(ticks, Ordering::Relaxed);
    }

    pub fn offset_position(&self, actuator: Actuator, ticks: i64) {
        self.cell(actuator).fetch_add(ticks, Ordering::Relaxed);
    }

    pub fn target(&self) -> i64 {
        self.target.load(Ordering::Relaxed)
    }

    pub fn set_target(&self, ticks: i64) {
        self.target.store(ticks, Ordering::Relaxed);
    }

    pub fn active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Midpoint of the two tracked positions, the hold target for `Stop`.
    pub fn midpoint(&self) -> i64 {
        (self.position(Actuator::A) + self.position(Actuator::B)) / 2
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pos_a: self.position(Actuator::A),
            pos_b: self.position(Actuator::B),
            target: self.target(),
            active: self.active(),
        }
    }
}

/// Quadrature decoder for one actuator.
///
/// Called from the edge-interrupt thread on each rising edge of the A
/// phase, with the B phase level sampled in the same callback: B low counts
/// up, B high counts down. The opposite wiring is a deployment-time pin
/// swap, not a runtime option. Does one atomic add and nothing else, so it
/// is safe at any interrupt rate.
#[derive(Clone)]
pub struct QuadratureCounter {
    state: Arc<ControlState>,
    actuator: Actuator,
}

impl QuadratureCounter {
    pub fn new(state: Arc<ControlState>, actuator: Actuator) -> Self {
        Self { state, actuator }
    }

    pub fn on_rising_edge(&self, b_high: bool) {
        let cell = self.state.cell(self.actuator);
        if b_high {
            cell.fetch_sub(1, Ordering::Relaxed);
        } else {
            cell.fetch_add(1, Ordering::Relaxed);
        }
    }
}
