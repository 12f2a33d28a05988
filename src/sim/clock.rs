/// Step clock over a scenario horizon.
///
/// Yields step indices in order together with the simulation time (h) at the
/// start of each step. The clock may be stopped early, after which it yields
/// nothing more.
///
/// # Examples
///
/// ```
/// use cycle_avail_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(3, 0.5);
/// let mut times = Vec::new();
///
/// while let Some(step) = clock.tick() {
///     times.push((step, clock.time_of(step)));
/// }
/// assert_eq!(times, vec![(0, 0.0), (1, 0.5), (2, 1.0)]);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    current: usize,
    total: usize,
    steplength: f64,
}

impl Clock {
    /// Creates a clock of `total` steps of `steplength` hours.
    pub fn new(total: usize, steplength: f64) -> Self {
        Self {
            current: 0,
            total,
            steplength,
        }
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(step)` - The step index before advancing
    /// * `None` - If the horizon is exhausted or the clock was stopped
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.total {
            let step = self.current;
            self.current += 1;
            Some(step)
        } else {
            None
        }
    }

    /// Simulation time (h) at the start of `step`.
    pub fn time_of(&self, step: usize) -> f64 {
        step as f64 * self.steplength
    }

    /// Steps not yet yielded.
    pub fn remaining(&self) -> usize {
        self.total - self.current
    }

    pub fn stop(&mut self) {
        self.current = self.total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_until_exhausted() {
        let mut clock = Clock::new(2, 1.0);
        assert_eq!(clock.tick(), Some(0));
        assert_eq!(clock.remaining(), 1);
        assert_eq!(clock.tick(), Some(1));
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn stop_ends_the_run() {
        let mut clock = Clock::new(10, 1.0);
        clock.tick();
        clock.stop();
        assert_eq!(clock.remaining(), 0);
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn time_scales_with_steplength() {
        let clock = Clock::new(5, 0.25);
        assert_eq!(clock.time_of(4), 1.0);
    }

    #[test]
    fn empty_clock_yields_nothing() {
        let mut clock = Clock::new(0, 1.0);
        assert_eq!(clock.remaining(), 0);
        assert_eq!(clock.tick(), None);
    }
}
