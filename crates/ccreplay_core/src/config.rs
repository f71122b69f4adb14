//! Replay configuration.

/// Configuration for a two-phase locking replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TplConfig {
    /// Take shared locks for reads, let readers co-hold an item and
    /// upgrade a held lock instead of waiting for it.
    pub upgrade: bool,

    /// Resolve conflicts with wound-wait instead of always waiting.
    pub rollback: bool,

    /// Log the full driver state after every step at `info` level.
    pub verbose: bool,
}

impl TplConfig {
    /// Creates a new configuration with every option disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether shared locks and lock upgrades are used.
    #[must_use]
    pub const fn upgrade(mut self, value: bool) -> Self {
        self.upgrade = value;
        self
    }

    /// Sets whether wound-wait preemption is used.
    #[must_use]
    pub const fn rollback(mut self, value: bool) -> Self {
        self.rollback = value;
        self
    }

    /// Sets whether per-step state dumps are logged at `info` level.
    #[must_use]
    pub const fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }
}

/// Configuration for an optimistic concurrency control replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OccConfig {
    /// Maximum rollbacks of a single transaction (`None` = unbounded).
    pub max_rollbacks: Option<usize>,

    /// Log the full driver state after every tick at `info` level.
    pub verbose: bool,
}

impl OccConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds how often one transaction may be rolled back.
    #[must_use]
    pub const fn max_rollbacks(mut self, limit: usize) -> Self {
        self.max_rollbacks = Some(limit);
        self
    }

    /// Sets whether per-tick state dumps are logged at `info` level.
    #[must_use]
    pub const fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }
}
