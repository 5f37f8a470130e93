//! Exponential backoff polling.

use std::{future::Future, time::Duration};

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};

/// Polling policy used while waiting for a condition, e.g. object removal
#[derive(Clone, Debug, PartialEq)]
pub struct WaitBackoff {
    pub initial_interval: Duration,
    /// Cap of a single sleep
    pub max_interval: Duration,
    /// Total time budget, waiting is abandoned once it is spent
    pub max_elapsed_time: Duration,
    pub multiplier: f64,
    /// Jitter, every sleep is randomized within `interval * (1 ± randomization_factor)`
    pub randomization_factor: f64,
}

impl Default for WaitBackoff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(60),
            max_elapsed_time: Duration::from_secs(15 * 60),
            multiplier: 1.5,
            randomization_factor: 0.5,
        }
    }
}

pub(crate) enum PollError<E> {
    Timeout,
    Condition(E),
}

impl WaitBackoff {
    /// Upper bound of condition checks
    pub fn steps(&self) -> u64 {
        if self.initial_interval.is_zero() {
            return 1;
        }
        let steps = self.max_elapsed_time.as_secs_f64() / self.initial_interval.as_secs_f64();
        (steps.ceil() as u64).max(1)
    }

    fn exponential(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(self.randomization_factor)
            .with_max_elapsed_time(Some(self.max_elapsed_time))
            .build()
    }

    /// Check `condition` until it reports `true`, sleeping between checks
    ///
    /// A condition error stops polling immediately.
    pub(crate) async fn poll<F, Fut, E>(&self, mut condition: F) -> Result<(), PollError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let mut backoff = self.exponential();
        for _ in 0..self.steps() {
            if condition().await.map_err(PollError::Condition)? {
                return Ok(());
            }
            match backoff.next_backoff() {
                Some(delay) => {
                    log::trace!("Condition not met, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await
                }
                None => break,
            }
        }
        Err(PollError::Timeout)
    }
}
