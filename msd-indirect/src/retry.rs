//! Bounded busy-bit polling

use msd_core::{Error, Result};
use std::thread;
use std::time::Duration;

/// What to do between two polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Poll again immediately
    Spin,
    /// Give up the rest of the time slice
    Yield,
    /// Sleep for a fixed interval
    Sleep(Duration),
}

impl Backoff {
    fn pause(self) {
        match self {
            Backoff::Spin => std::hint::spin_loop(),
            Backoff::Yield => thread::yield_now(),
            Backoff::Sleep(interval) => thread::sleep(interval),
        }
    }
}

/// Poll bound and pacing of one indirect window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Polls before giving up
    pub max_polls: u32,
    /// Pacing between polls
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Policy polling at most `max_polls` times, yielding in between
    pub const fn new(max_polls: u32) -> Self {
        Self {
            max_polls,
            backoff: Backoff::Yield,
        }
    }

    /// Change the pacing
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Call `ready` until it returns true, at most `max_polls` times
    ///
    /// Returns the number of polls used. Exhaustion is [`Error::Timeout`].
    pub fn poll<F>(&self, block: &str, mut ready: F) -> Result<u32>
    where
        F: FnMut() -> Result<bool>,
    {
        for attempt in 1..=self.max_polls {
            if ready()? {
                return Ok(attempt);
            }
            if attempt < self.max_polls {
                self.backoff.pause();
            }
        }
        Err(Error::Timeout {
            block: block.to_string(),
            polls: self.max_polls,
        })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(100)
    }
}
