use std::time::Duration;

use tracing::{info, warn};

use crate::TeardownConfig;

/// Cooperative wait for the host to finish destroying a level.
#[derive(Clone, Debug)]
pub(crate) struct Teardown {
    settle: Duration,
    expected_ticks: u64,
    polls: u64,
    warned: bool,
    settle_remaining: Option<Duration>,
}

impl Teardown {
    pub(crate) fn start(config: &TeardownConfig) -> Self {
        Self {
            settle: config.settle_delay(),
            expected_ticks: config.expected_ticks,
            polls: 0,
            warned: false,
            settle_remaining: None,
        }
    }

    /// Advances the wait by `dt`. Returns `true` once the host reported an
    /// empty level and the settle delay elapsed.
    pub(crate) fn poll(&mut self, dt: Duration, live_entities: usize, used_tiles: usize) -> bool {
        self.polls = self.polls.saturating_add(1);

        let Some(remaining) = self.settle_remaining else {
            if live_entities == 0 && used_tiles == 0 {
                self.settle_remaining = Some(self.settle);
                return self.settle.is_zero();
            }
            if !self.warned && self.polls > self.expected_ticks {
                self.warned = true;
                warn!(
                    polls = self.polls,
                    live_entities, used_tiles, "level teardown is taking longer than expected"
                );
            }
            return false;
        };

        let remaining = remaining.saturating_sub(dt);
        self.settle_remaining = Some(remaining);
        if remaining.is_zero() {
            info!(polls = self.polls, "level cleared");
            true
        } else {
            false
        }
    }
}
