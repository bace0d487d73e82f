//! Injected pseudo-random source for the device simulators.

use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::config::DeviceProfile;

/// Seedable random source shared by the simulators.
///
/// Batches run sequentially, so with a fixed seed the sequence of draws (and
/// therefore every outcome) is reproducible.
#[derive(Debug)]
pub struct SimRng {
    inner: Mutex<StdRng>,
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    /// True with probability `p`.
    pub async fn roll(&self, p: f64) -> bool {
        self.inner.lock().await.gen::<f64>() < p
    }

    /// Latency drawn uniformly from the profile's inclusive range.
    pub async fn latency(&self, profile: &DeviceProfile) -> Duration {
        let (min, max) = (profile.latency_min_ms, profile.latency_max_ms);
        let ms = if max <= min {
            min
        } else {
            self.inner.lock().await.gen_range(min..=max)
        };
        Duration::from_millis(ms)
    }

    /// Uniform index in `0..len`; `len` must be non-zero.
    pub async fn index(&self, len: usize) -> usize {
        self.inner.lock().await.gen_range(0..len.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_seed_same_draws() {
        let a = SimRng::seeded(7);
        let b = SimRng::seeded(7);
        for _ in 0..32 {
            assert_eq!(a.roll(0.5).await, b.roll(0.5).await);
        }
    }

    #[tokio::test]
    async fn test_certain_probabilities() {
        let rng = SimRng::seeded(1);
        for _ in 0..64 {
            assert!(rng.roll(1.0).await);
            assert!(!rng.roll(0.0).await);
        }
    }

    #[tokio::test]
    async fn test_latency_within_profile() {
        let rng = SimRng::seeded(3);
        let profile = DeviceProfile::printer();
        for _ in 0..64 {
            let ms = rng.latency(&profile).await.as_millis();
            assert!((50..=150).contains(&ms));
        }
        assert_eq!(rng.latency(&DeviceProfile::instant(1.0)).await, Duration::ZERO);
    }

    #[test]
    fn test_index_stays_in_bounds() {
        let rng = SimRng::seeded(9);
        tokio_test::block_on(async {
            for len in 1..50 {
                assert!(rng.index(len).await < len);
            }
        });
    }
}
