//! Scheduling options for the traversal engine

/// Default cap on concurrently issued probes
pub const DEFAULT_MAX_IN_FLIGHT_PROBES: usize = 128;

/// Decides when a new directory may be dequeued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulePolicy {
    /// Never start a listing while any listing or probe is outstanding
    /// anywhere in the tree.
    #[default]
    GlobalBarrier,

    /// Start listings while other waves are still probing, keeping at most
    /// `max_listings` listings in flight.
    Overlapped { max_listings: usize },
}

/// Options for a single traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOptions {
    pub policy: SchedulePolicy,

    /// Maximum probes issued but not yet completed; `None` is unbounded
    pub max_in_flight_probes: Option<usize>,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            policy: SchedulePolicy::GlobalBarrier,
            max_in_flight_probes: Some(DEFAULT_MAX_IN_FLIGHT_PROBES),
        }
    }
}

impl TraversalOptions {
    /// One probe per entry, all issued at once
    pub fn unbounded() -> Self {
        Self {
            max_in_flight_probes: None,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: SchedulePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_probe_limit(mut self, limit: Option<usize>) -> Self {
        self.max_in_flight_probes = limit;
        self
    }

    /// Effective probe cap; a limit of zero is treated as one
    pub(crate) fn probe_cap(&self) -> usize {
        self.max_in_flight_probes.map_or(usize::MAX, |n| n.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TraversalOptions::default();
        assert_eq!(options.policy, SchedulePolicy::GlobalBarrier);
        assert_eq!(options.max_in_flight_probes, Some(DEFAULT_MAX_IN_FLIGHT_PROBES));
        assert_eq!(TraversalOptions::unbounded().probe_cap(), usize::MAX);
    }

    #[test]
    fn test_zero_probe_limit_still_makes_progress() {
        let options = TraversalOptions::default().with_probe_limit(Some(0));
        assert_eq!(options.probe_cap(), 1);
    }
}
