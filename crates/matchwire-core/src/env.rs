//! Environment abstraction for deterministic testing.
//!
//! Decouples engine logic from system resources (time, randomness). The
//! state machines never read the clock themselves; callers pass instants
//! in and drivers own the only async primitive (`sleep`). This makes every
//! timing-sensitive path testable with a virtual clock.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; test environments
    /// use a virtual clock built on the same type.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// This is the ONLY async method in the trait, and it should only be
    /// used by driver code (not engine logic).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Convenience for locally generated identifiers (queued message ids).
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Production environment: system clock, OS entropy, tokio sleep.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(buffer);
    }
}

/// Deterministic environments for tests and simulation.
pub mod test_utils {
    use std::{
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    use super::Environment;

    struct MockState {
        offset: Duration,
        rng: ChaCha20Rng,
    }

    /// Virtual-clock environment with a seeded RNG.
    ///
    /// Time only moves when the test calls [`MockEnv::advance`] or when
    /// driver code awaits `sleep` (which advances the clock by the full
    /// duration and resolves immediately).
    #[derive(Clone)]
    pub struct MockEnv {
        base: Instant,
        state: Arc<Mutex<MockState>>,
    }

    impl MockEnv {
        /// Create a mock environment with the default seed.
        pub fn new() -> Self {
            Self::with_seed(42)
        }

        /// Create a mock environment with a specific RNG seed.
        pub fn with_seed(seed: u64) -> Self {
            Self {
                base: Instant::now(),
                state: Arc::new(Mutex::new(MockState {
                    offset: Duration::ZERO,
                    rng: ChaCha20Rng::seed_from_u64(seed),
                })),
            }
        }

        /// Move the virtual clock forward.
        pub fn advance(&self, duration: Duration) {
            if let Ok(mut state) = self.state.lock() {
                state.offset += duration;
            }
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Environment for MockEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.state.lock().map_or(self.base, |state| self.base + state.offset)
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            self.advance(duration);
            std::future::ready(())
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            if let Ok(mut state) = self.state.lock() {
                state.rng.fill_bytes(buffer);
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clock_advances_only_on_request() {
            let env = MockEnv::new();
            let t0 = env.now();

            assert_eq!(env.now(), t0);

            env.advance(Duration::from_secs(30));
            assert_eq!(env.now() - t0, Duration::from_secs(30));
        }

        #[test]
        fn seeded_rng_is_deterministic() {
            let a = MockEnv::with_seed(7);
            let b = MockEnv::with_seed(7);

            assert_eq!(a.random_u64(), b.random_u64());
            assert_eq!(a.random_u64(), b.random_u64());
        }

        #[test]
        fn different_seeds_diverge() {
            let a = MockEnv::with_seed(1);
            let b = MockEnv::with_seed(2);

            assert_ne!(a.random_u64(), b.random_u64());
        }

        #[test]
        fn clones_share_the_clock() {
            let env = MockEnv::new();
            let clone = env.clone();
            let t0 = env.now();

            clone.advance(Duration::from_secs(5));
            assert_eq!(env.now() - t0, Duration::from_secs(5));
        }
    }
}
