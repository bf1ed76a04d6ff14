/// Converts variable frame deltas into a bounded number of fixed sub-steps.
///
/// Leftover time below one sub-step carries into the next frame. When more sub-steps
/// are due than allowed, the surplus is dropped rather than caught up later, so a long
/// stall costs at most `max_sub_steps` steps.
#[derive(Clone, Debug)]
pub struct FixedStepper {
    fixed_dt: f32,
    accumulator: f64,
}

/// What the world should simulate for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubSteps {
    pub count: u32,
    pub dt: f32,
}

impl FixedStepper {
    pub fn new(fixed_dt: f32) -> Self {
        debug_assert!(fixed_dt > 0.0);
        Self {
            fixed_dt,
            accumulator: 0.0,
        }
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Time carried over to the next frame.
    pub fn remainder(&self) -> f32 {
        self.accumulator as f32
    }

    /// Account for `dt` seconds of frame time.
    ///
    /// `max_sub_steps == 0` requests a single variable-length step of `dt`.
    /// Negative or non-finite deltas advance nothing.
    pub fn advance(&mut self, dt: f32, max_sub_steps: u32) -> SubSteps {
        if !dt.is_finite() || dt <= 0.0 {
            return SubSteps {
                count: 0,
                dt: self.fixed_dt,
            };
        }

        if max_sub_steps == 0 {
            return SubSteps { count: 1, dt };
        }

        let fixed = self.fixed_dt as f64;
        self.accumulator += dt as f64;
        let due = (self.accumulator / fixed).floor();
        // `rem_euclid` is exact even when `due * fixed` no longer is.
        self.accumulator = self.accumulator.rem_euclid(fixed);

        SubSteps {
            count: (due as u64).min(max_sub_steps as u64) as u32,
            dt: self.fixed_dt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: f32 = 1.0 / 60.0;

    #[test]
    fn oversized_delta_is_capped_and_leaves_a_sane_remainder() {
        let mut s = FixedStepper::new(H);
        assert_eq!(s.advance(f32::MAX, 10).count, 10);
        assert!((0.0..=H).contains(&s.remainder()));
        assert_eq!(s.advance(H, 10).count, 1);
    }

    #[test]
    fn small_deltas_accumulate_into_one_step() {
        let mut s = FixedStepper::new(H);
        assert_eq!(s.advance(H * 0.5, 10).count, 0);
        assert_eq!(s.advance(H * 0.6, 10).count, 1);
        assert!(s.remainder() < H);
    }

    #[test]
    fn huge_delta_is_capped() {
        let mut s = FixedStepper::new(H);
        assert_eq!(s.advance(1000.0, 10).count, 10);
        // The backlog was dropped, not queued.
        assert!(s.remainder() < H);
        assert!(s.advance(H * 0.5, 10).count <= 1);
    }

    #[test]
    fn zero_max_sub_steps_takes_one_variable_step() {
        let mut s = FixedStepper::new(H);
        assert_eq!(s.advance(0.1, 0), SubSteps { count: 1, dt: 0.1 });
    }

    #[test]
    fn bad_deltas_do_nothing() {
        let mut s = FixedStepper::new(H);
        assert_eq!(s.advance(-1.0, 10).count, 0);
        assert_eq!(s.advance(f32::NAN, 10).count, 0);
        assert_eq!(s.advance(f32::INFINITY, 10).count, 0);
        assert_eq!(s.remainder(), 0.0);
    }
}
