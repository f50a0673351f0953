use std::time::{Duration, Instant};

/// Shortest interval accepted between repeats
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of repeated commands for held directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatPolicy {
    /// How long a control must be held before the first repeat is scheduled
    pub delay: Duration,
    pub interval: Duration,
}

impl RepeatPolicy {
    pub fn new(delay: Duration, interval: Duration) -> Self {
        Self {
            delay,
            interval: interval.max(MIN_INTERVAL),
        }
    }
}

impl Default for RepeatPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(150))
    }
}

/// Repeat schedule of a single held control
///
/// Repeat `n` (starting at 1) is due at `pressed_at + delay + n * interval`. The schedule only
/// depends on time, so the same repeats are produced however often it is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatTimer {
    pressed_at: Instant,
    emitted: u32,
}

impl RepeatTimer {
    pub fn new(pressed_at: Instant) -> Self {
        Self {
            pressed_at,
            emitted: 0,
        }
    }

    pub fn pressed_at(&self) -> Instant {
        self.pressed_at
    }

    /// Number of repeats returned so far
    pub fn emitted(&self) -> u32 {
        self.emitted
    }

    fn tick(&self, n: u32, policy: &RepeatPolicy) -> Instant {
        self.pressed_at + policy.delay + policy.interval * n
    }

    /// Time of the most recent repeat returned, if any
    pub fn last_repeat(&self, policy: &RepeatPolicy) -> Option<Instant> {
        (self.emitted > 0).then(|| self.tick(self.emitted, policy))
    }

    /// True once the control has been held past the initial delay
    pub fn is_repeating(&self, now: Instant, policy: &RepeatPolicy) -> bool {
        now >= self.pressed_at + policy.delay
    }

    /// Timestamps of the repeats due by `now` which were not returned by an earlier call
    pub fn due(&mut self, now: Instant, policy: &RepeatPolicy) -> Vec<Instant> {
        let mut due = Vec::new();

        loop {
            let next = self.tick(self.emitted + 1, policy);
            if next > now {
                break;
            }
            due.push(next);
            self.emitted += 1;
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test_case(&[1000]; "single late poll")]
    #[test_case(&[16, 400, 649, 650, 799, 1000]; "irregular polls")]
    #[test_case(&(0..=62).map(|frame| frame * 16).collect::<Vec<_>>(); "every frame")]
    fn test_due_independent_of_polling(polls: &[u64]) {
        let start = Instant::now();
        let policy = RepeatPolicy::default();
        let mut timer = RepeatTimer::new(start);

        let due: Vec<Instant> = polls
            .iter()
            .flat_map(|poll| timer.due(start + ms(*poll), &policy))
            .collect();

        assert_eq!(due, vec![start + ms(650), start + ms(800), start + ms(950)]);
        assert_eq!(timer.emitted(), 3);
        assert_eq!(timer.last_repeat(&policy), Some(start + ms(950)));
    }

    #[test]
    fn test_is_repeating() {
        let start = Instant::now();
        let policy = RepeatPolicy::default();
        let timer = RepeatTimer::new(start);

        assert!(!timer.is_repeating(start + ms(499), &policy));
        assert!(timer.is_repeating(start + ms(500), &policy));
        assert_eq!(timer.last_repeat(&policy), None);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let start = Instant::now();
        let policy = RepeatPolicy::new(Duration::ZERO, Duration::ZERO);
        let mut timer = RepeatTimer::new(start);

        assert_eq!(timer.due(start + ms(5), &policy).len(), 5);
    }
}
