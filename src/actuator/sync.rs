// Rate-matching position control for the actuator pair.
//
// Both actuators chase one shared target. Friction and manufacturing
// mismatch make them travel at different real speeds, so whichever member
// runs ahead of its sibling by more than the direction-specific margin is
// dropped to the yield speed until the other closes the gap.

use crate::config::SyncConfig;
use crate::state::Snapshot;

/// Speeds commanded for one tick, plus whether the pair just settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutput {
    pub speed_a: i32,
    pub speed_b: i32,
    /// True exactly on the transition into "both inside the dead-band".
    /// The runtime persists the positions when it sees this.
    pub persist: bool,
}

impl TickOutput {
    const IDLE: TickOutput = TickOutput {
        speed_a: 0,
        speed_b: 0,
        persist: false,
    };
}

pub struct SyncController {
    cfg: SyncConfig,
    settled: bool,
}

impl SyncController {
    pub fn new(cfg: SyncConfig) -> Self {
        Self {
            cfg,
            settled: false,
        }
    }

    /// One control tick over a consistent snapshot.
    pub fn tick(&mut self, snap: &Snapshot) -> TickOutput {
        if !snap.active {
            // Forced idle. The settle latch is left untouched so a
            // deactivate/reactivate inside the dead-band does not write
            // the position record a second time.
            return TickOutput::IDLE;
        }

        let diff_a = snap.pos_a - snap.target;
        let diff_b = snap.pos_b - snap.target;

        let mut nominal_a = self.cfg.full_speed;
        let mut nominal_b = self.cfg.full_speed;

        if diff_a < 0 && diff_b < 0 {
            // both extending; the higher position leads
            if snap.pos_a + self.cfg.extend_spread < snap.pos_b {
                nominal_b = self.cfg.yield_speed;
            }
            if snap.pos_b + self.cfg.extend_spread < snap.pos_a {
                nominal_a = self.cfg.yield_speed;
            }
        }
        if diff_a > 0 && diff_b > 0 {
            // both retracting; the lower position leads
            if snap.pos_a - self.cfg.retract_spread > snap.pos_b {
                nominal_b = self.cfg.yield_speed;
            }
            if snap.pos_b - self.cfg.retract_spread > snap.pos_a {
                nominal_a = self.cfg.yield_speed;
            }
        }

        let speed_a = self.toward_target(diff_a, nominal_a);
        let speed_b = self.toward_target(diff_b, nominal_b);

        let now_settled = speed_a == 0 && speed_b == 0;
        let persist = now_settled && !self.settled;
        self.settled = now_settled;

        TickOutput {
            speed_a,
            speed_b,
            persist,
        }
    }

    /// Dead-band decision for one actuator: drive toward the target at the
    /// given nominal speed, or stop when already inside the window.
    fn toward_target(&self, diff: i64, nominal: i32) -> i32 {
        if diff > self.cfg.dead_band {
            -nominal
        } else if diff < -self.cfg.dead_band {
            nominal
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pos_a: i64, pos_b: i64, target: i64) -> Snapshot {
        Snapshot {
            pos_a,
            pos_b,
            target,
            active: true,
        }
    }

    fn controller() -> SyncController {
        SyncController::new(SyncConfig::default())
    }

    #[test]
    fn inactive_forces_zero_output() {
        let mut ctl = controller();
        let mut s = snap(500, 496, 0);
        s.active = false;
        assert_eq!(ctl.tick(&s), TickOutput::IDLE);

        // reactivating resumes normal control on the following tick
        s.active = true;
        let out = ctl.tick(&s);
        assert_eq!(out.speed_a, -63000);
        assert_eq!(out.speed_b, -63000);
    }

    #[test]
    fn dead_band_boundaries() {
        let mut ctl = controller();
        // ten ticks off target is inside the window, eleven is not
        assert_eq!(ctl.tick(&snap(10, 0, 0)).speed_a, 0);
        assert_eq!(ctl.tick(&snap(11, 0, 0)).speed_a, -63000);
        assert_eq!(ctl.tick(&snap(-10, 0, 0)).speed_a, 0);
        assert_eq!(ctl.tick(&snap(-11, 0, 0)).speed_a, 63000);
    }

    #[test]
    fn extending_leader_yields() {
        let mut ctl = controller();
        // both below target, A ahead of B by 20 (> 5 tick extend margin)
        let out = ctl.tick(&snap(100, 80, 1000));
        assert_eq!(out.speed_a, 55000);
        assert_eq!(out.speed_b, 63000);
    }

    #[test]
    fn retracting_leader_yields() {
        let mut ctl = controller();
        // both above target, B ahead of A by 20 (> 10 tick retract margin)
        let out = ctl.tick(&snap(100, 80, -1000));
        assert_eq!(out.speed_a, -63000);
        assert_eq!(out.speed_b, -55000);
    }

    #[test]
    fn spread_margins_are_asymmetric() {
        let mut ctl = controller();
        // an 8 tick lead triggers the extend margin (5) but not the
        // retract margin (10)
        let extending = ctl.tick(&snap(88, 80, 1000));
        assert_eq!(extending.speed_a, 55000);
        assert_eq!(extending.speed_b, 63000);

        let retracting = ctl.tick(&snap(88, 80, -1000));
        assert_eq!(retracting.speed_a, -63000);
        assert_eq!(retracting.speed_b, -63000);
    }

    #[test]
    fn no_yield_when_directions_disagree() {
        let mut ctl = controller();
        // A above target, B below: each drives on its own, full speed
        let out = ctl.tick(&snap(60, -60, 0));
        assert_eq!(out.speed_a, -63000);
        assert_eq!(out.speed_b, 63000);
    }

    #[test]
    fn persist_fires_once_per_settle_transition() {
        let mut ctl = controller();

        assert!(!ctl.tick(&snap(100, 100, 0)).persist); // travelling
        assert!(ctl.tick(&snap(3, -2, 0)).persist); // both arrive
        assert!(!ctl.tick(&snap(3, -2, 0)).persist); // holding writes nothing
        assert!(!ctl.tick(&snap(3, -2, 0)).persist);
        assert!(!ctl.tick(&snap(3, 200, 0)).persist); // disturbed, moving again
        assert!(ctl.tick(&snap(3, 2, 0)).persist); // re-armed
    }

    #[test]
    fn persist_fires_when_arrivals_are_staggered() {
        let mut ctl = controller();
        // A inside the window first, B still travelling
        let first = ctl.tick(&snap(5, 300, 0));
        assert_eq!(first.speed_a, 0);
        assert!(!first.persist);
        // B arrives ticks later; the settle event must still be reported
        assert!(ctl.tick(&snap(5, 4, 0)).persist);
    }

    #[test]
    fn deactivation_does_not_rearm_the_settle_latch() {
        let mut ctl = controller();
        assert!(ctl.tick(&snap(0, 0, 0)).persist);

        let mut idle = snap(0, 0, 0);
        idle.active = false;
        assert!(!ctl.tick(&idle).persist);
        // back on, still in the dead-band: no duplicate write
        assert!(!ctl.tick(&snap(0, 0, 0)).persist);
    }

    #[test]
    fn repeated_ticks_converge_into_the_dead_band() {
        // Plant model: per tick each actuator moves speed/gain ticks, with
        // unequal gains standing in for friction mismatch.
        const GAIN_A: i64 = 19_000;
        const GAIN_B: i64 = 25_000;

        let mut ctl = controller();
        let (mut pos_a, mut pos_b) = (0i64, -30i64);
        let target = 500i64;

        let mut persists = 0;
        let mut max_spread = (pos_a - pos_b).abs();
        let mut settled_at = None;

        for tick in 0..2_000 {
            let out = ctl.tick(&snap(pos_a, pos_b, target));
            if out.persist {
                persists += 1;
            }
            if out.speed_a == 0 && out.speed_b == 0 {
                settled_at = Some(tick);
                break;
            }
            pos_a += out.speed_a as i64 / GAIN_A;
            pos_b += out.speed_b as i64 / GAIN_B;
            max_spread = max_spread.max((pos_a - pos_b).abs());
        }

        assert!(settled_at.is_some(), "pair never settled");
        assert!((pos_a - target).abs() <= 10);
        assert!((pos_b - target).abs() <= 10);
        // the yield rule keeps the initial 30 tick spread from growing
        assert!(max_spread <= 35, "spread grew to {max_spread}");
        assert_eq!(persists, 1);
    }
}
