//! Polling a rental until it reaches a lifecycle state.
//!
//! The API only exposes pull-based status, so [`RentalWaiter`] repeatedly asks a
//! [`RentalStatusProvider`] for a snapshot. A wait ends in exactly one of four ways:
//!
//! - the target state is observed and the snapshot is returned;
//! - a terminal-failure state other than the target is observed
//!   ([`Error::RentalTerminalState`]);
//! - the deadline passes ([`Error::RentalWaitTimeout`], carrying the last observed state);
//! - the provider fails, and its error is returned unchanged.
//!
//! The target is compared before the terminal-failure set, so waiting for
//! `Terminated` succeeds once the rental is terminated. Provider errors are never
//! retried by the waiter. Dropping the returned future cancels the wait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use basilica_core::{Error, RentalState, TERMINAL_FAILURE_STATES};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::models::RentalStatus;
use crate::Result;

/// Default state awaited by [`WaitOptions`].
pub const DEFAULT_TARGET_STATE: RentalState = RentalState::Active;

/// Default deadline for a wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default spacing between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Read-only lookup of a rental's current status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RentalStatusProvider: Send + Sync {
    /// Fetch the current status of `rental_id`.
    async fn get_rental(&self, rental_id: &str) -> Result<RentalStatus>;
}

#[async_trait]
impl<P> RentalStatusProvider for Arc<P>
where
    P: RentalStatusProvider + ?Sized,
{
    async fn get_rental(&self, rental_id: &str) -> Result<RentalStatus> {
        (**self).get_rental(rental_id).await
    }
}

/// Parameters of a single wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// State to wait for.
    pub target_state: RentalState,
    /// Maximum time to wait.
    pub timeout: Duration,
    /// Delay between consecutive status checks.
    pub poll_interval: Duration,
}

impl WaitOptions {
    /// Wait for `Active` for up to five minutes, polling every five seconds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target_state: DEFAULT_TARGET_STATE,
            timeout: DEFAULT_WAIT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the state to wait for.
    #[must_use]
    pub fn with_target_state(mut self, state: RentalState) -> Self {
        self.target_state = state;
        self
    }

    /// Set the deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Reject a zero timeout or poll interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidRequest(
                "wait timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidRequest(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for rentals to reach a lifecycle state.
#[derive(Debug, Clone)]
pub struct RentalWaiter<P> {
    provider: P,
    terminal_states: Vec<RentalState>,
}

impl<P> RentalWaiter<P>
where
    P: RentalStatusProvider,
{
    /// Create a waiter that treats [`TERMINAL_FAILURE_STATES`] as terminal.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self::with_terminal_states(provider, TERMINAL_FAILURE_STATES)
    }

    /// Create a waiter with a custom terminal-failure set.
    #[must_use]
    pub fn with_terminal_states<I>(provider: P, terminal_states: I) -> Self
    where
        I: IntoIterator<Item = RentalState>,
    {
        Self {
            provider,
            terminal_states: terminal_states.into_iter().collect(),
        }
    }

    /// States that end a wait with [`Error::RentalTerminalState`].
    #[must_use]
    pub fn terminal_states(&self) -> &[RentalState] {
        &self.terminal_states
    }

    /// Return the status provider.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Poll `rental_id` until it reaches `options.target_state`.
    ///
    /// Polls are sequential and separated by the full poll interval. No poll starts
    /// once the timeout has elapsed.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] for a zero timeout or poll interval, before any poll.
    /// - [`Error::RentalTerminalState`] when a terminal-failure state is observed.
    /// - [`Error::RentalWaitTimeout`] when the deadline passes.
    /// - Any error returned by the provider, unchanged.
    pub async fn wait_for_rental(
        &self,
        rental_id: &str,
        options: &WaitOptions,
    ) -> Result<RentalStatus> {
        options.validate()?;

        let start = Instant::now();
        let mut last_state = None;
        let mut polls: u32 = 0;

        info!(
            rental_id,
            target_state = %options.target_state,
            timeout_secs = options.timeout.as_secs(),
            "Waiting for rental"
        );

        while start.elapsed() < options.timeout {
            let status = self.provider.get_rental(rental_id).await?;
            polls += 1;

            let state = status.state();
            debug!(
                rental_id,
                state = %state,
                poll = polls,
                elapsed_secs = start.elapsed().as_secs(),
                "Polled rental status"
            );

            if *state == options.target_state {
                info!(rental_id, state = %state, polls, "Rental reached target state");
                return Ok(status);
            }

            if self.terminal_states.contains(state) {
                warn!(rental_id, state = %state, polls, "Rental reached terminal state");
                return Err(Error::RentalTerminalState {
                    rental_id: rental_id.to_string(),
                    state: state.clone(),
                });
            }

            last_state = Some(state.clone());
            sleep(options.poll_interval).await;
        }

        let elapsed = start.elapsed();
        warn!(
            rental_id,
            target_state = %options.target_state,
            elapsed_secs = elapsed.as_secs(),
            polls,
            "Timed out waiting for rental"
        );

        Err(Error::RentalWaitTimeout {
            rental_id: rental_id.to_string(),
            target_state: options.target_state.clone(),
            elapsed,
            last_state,
        })
    }
}
