use crate::config::RateLimitConfig;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Admission control for outbound requests
///
/// Admits at most `capacity` requests per `refill_window`. Tokens come back
/// lazily on every acquisition attempt: a full window since the last refill
/// resets the bucket, anything shorter returns one token per
/// `refill_window / capacity` elapsed.
///
/// The bucket is shared by reference between all fetch workers; the state is
/// behind a single mutex that is never held across an `.await`.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_window: Duration,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket
    pub fn new(capacity: u32, refill_window: Duration) -> Self {
        Self::starting_at(capacity, refill_window, Instant::now())
    }

    /// Creates a full bucket from the `[rate-limit]` section
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.capacity,
            Duration::from_millis(config.refill_window),
        )
    }

    fn starting_at(capacity: u32, refill_window: Duration, start: Instant) -> Self {
        Self {
            capacity,
            refill_window,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: start,
            }),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn refill_window(&self) -> Duration {
        self.refill_window
    }

    /// Tokens left as of the last acquisition attempt
    pub fn available(&self) -> u32 {
        self.lock().tokens
    }

    /// Takes one token if one is available, without waiting
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut state = self.lock();
        self.refill(&mut state, now);

        if state.tokens > 0 {
            state.tokens -= 1;
            true
        } else {
            false
        }
    }

    /// Waits until a token is available
    ///
    /// Each denial sleeps one full refill window before trying again. There is
    /// no retry cap.
    pub async fn acquire_blocking(&self) {
        while !self.try_acquire() {
            tracing::info!(
                "Rate limit exceeded, waiting {:?} before retrying",
                self.refill_window
            );
            tokio::time::sleep(self.refill_window).await;
        }
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill);

        if elapsed >= self.refill_window {
            state.tokens = self.capacity;
            state.last_refill = now;
            return;
        }

        let per_token = match self.refill_window.checked_div(self.capacity) {
            Some(d) if !d.is_zero() => d,
            // capacity 0 never admits; sub-nanosecond slices only refill on a full window
            _ => return,
        };

        let earned = (elapsed.as_nanos() / per_token.as_nanos()).min(self.capacity as u128) as u32;
        if earned == 0 {
            return;
        }

        state.tokens = state.tokens.saturating_add(earned).min(self.capacity);
        // Advance by the time actually converted into tokens so the remainder
        // carries over to the next call
        state.last_refill += per_token * earned;
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
