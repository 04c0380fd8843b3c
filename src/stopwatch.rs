use std::time::Duration;
use tdigest::TDigest;

use crate::io::UserId;

pub type UserDurationMicros = (UserId, f64);

/// Measures how long each user's evaluation takes.
#[derive(Clone, Default)]
pub struct Stopwatch {
    user_durations: Vec<UserDurationMicros>,
}

impl Stopwatch {
    pub fn new() -> Stopwatch {
        Stopwatch {
            user_durations: Vec::new(),
        }
    }

    pub fn record(&mut self, user_id: UserId, duration: Duration) {
        self.user_durations
            .push((user_id, duration.as_micros() as f64));
    }

    pub fn get_n(&self) -> usize {
        self.user_durations.len()
    }

    /// `q` in [0, 1]. Zero when nothing was recorded.
    pub fn get_percentile_in_micros(&self, q: f64) -> f64 {
        if self.user_durations.is_empty() {
            return 0.0;
        }
        let t_digest = TDigest::new_with_size(100);
        let durations = self
            .user_durations
            .iter()
            .map(|tuple| tuple.1)
            .collect();
        let sorted_digest = t_digest.merge_unsorted(durations);
        sorted_digest.estimate_quantile(q)
    }
}
