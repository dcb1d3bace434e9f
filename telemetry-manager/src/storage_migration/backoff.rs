//! Retry budget of the migration.
use std::time::Duration;

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_FACTOR: f64 = 2.0;
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(5);
const DEFAULT_STEPS: usize = 10;
const DEFAULT_DEADLINE: Duration = Duration::from_secs(5 * 60);

/// Exponential backoff shared by every retry loop of a migration run, plus the deadline of the
/// whole run.
#[derive(Clone, Debug, PartialEq)]
pub struct Backoff {
    initial_delay: Duration,
    factor: f64,
    max_delay: Duration,
    steps: usize,
    deadline: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            factor: DEFAULT_FACTOR,
            max_delay: DEFAULT_MAX_DELAY,
            steps: DEFAULT_STEPS,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

impl Backoff {
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Number of retries a single operation gets.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Pause before retry number `attempt`, counting from zero.
    pub fn delay(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.initial_delay.as_secs_f64() * self.factor.powi(exponent);
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay)
    }
}
