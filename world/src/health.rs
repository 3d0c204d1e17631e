use delve_core::Health;

/// Integer hit points owned by the session for each agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitPoints {
    current: i32,
    max: i32,
}

impl HitPoints {
    /// Creates a full health pool.
    #[must_use]
    pub const fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Reports whether health reached zero.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current <= 0
    }
}

impl Health for HitPoints {
    fn take_damage(&mut self, amount: i32) {
        self.current = self.current.saturating_sub(amount.max(0)).max(0);
    }

    fn current_health(&self) -> i32 {
        self.current
    }
}
