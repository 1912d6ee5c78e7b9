//! Random sources for percentage bucketing and the skip experiment

use std::collections::VecDeque;
use std::sync::Mutex;

/// Uniform samples in `[0, 1)`, the only randomness the frame uses.
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;

    /// Index in `0..len`, `None` for an empty range.
    fn pick_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let index = (self.next_f64() * len as f64).floor() as usize;
        Some(index.min(len - 1))
    }
}

/// `fastrand`-backed source; seed it for reproducible runs.
pub struct FastRandom {
    rng: Mutex<fastrand::Rng>,
}

impl FastRandom {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for FastRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for FastRandom {
    fn next_f64(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.f64(),
            // a poisoned lock still holds a usable generator
            Err(poisoned) => poisoned.into_inner().f64(),
        }
    }
}

/// Replays scripted samples, then repeats the last one (0.0 when empty).
pub struct FixedRandom {
    samples: Mutex<VecDeque<f64>>,
    last: Mutex<f64>,
}

impl FixedRandom {
    pub fn new(samples: impl IntoIterator<Item = f64>) -> Self {
        Self {
            samples: Mutex::new(samples.into_iter().collect()),
            last: Mutex::new(0.0),
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::new([value])
    }
}

impl RandomSource for FixedRandom {
    fn next_f64(&self) -> f64 {
        let next = self.samples.lock().ok().and_then(|mut s| s.pop_front());
        let Ok(mut last) = self.last.lock() else {
            return next.unwrap_or(0.0);
        };
        if let Some(value) = next {
            *last = value;
        }
        *last
    }
}
