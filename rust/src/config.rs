//! Configuration types for schedule validation.

use pyo3::prelude::*;

use crate::error::ScheduleError;

/// How a multi-day schedule request treats a conflict on one of its days.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Any conflicting day rejects the whole request.
    AllOrNothing,
    /// Conflicting days are rejected, the rest are accepted.
    BestEffort,
}

impl BatchPolicy {
    pub fn parse(value: &str) -> Result<Self, ScheduleError> {
        match value {
            "all_or_nothing" => Ok(BatchPolicy::AllOrNothing),
            "best_effort" => Ok(BatchPolicy::BestEffort),
            other => Err(ScheduleError::UnknownBatchPolicy(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchPolicy::AllOrNothing => "all_or_nothing",
            BatchPolicy::BestEffort => "best_effort",
        }
    }
}

/// Configuration for the collision resolver and schedule service.
#[pyclass]
#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Batch atomicity policy: "all_or_nothing" or "best_effort"
    #[pyo3(get, set)]
    pub batch_policy: String,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            batch_policy: BatchPolicy::AllOrNothing.as_str().to_string(),
            verbosity: 0,
        }
    }
}

impl ResolverConfig {
    /// Parsed batch policy.
    pub fn policy(&self) -> Result<BatchPolicy, ScheduleError> {
        BatchPolicy::parse(&self.batch_policy)
    }
}

#[pymethods]
impl ResolverConfig {
    #[new]
    #[pyo3(signature = (batch_policy=None, verbosity=None))]
    fn new(batch_policy: Option<String>, verbosity: Option<u8>) -> Self {
        let defaults = Self::default();
        Self {
            batch_policy: batch_policy.unwrap_or(defaults.batch_policy),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "ResolverConfig(batch_policy={:?}, verbosity={})",
            self.batch_policy, self.verbosity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_all_or_nothing() {
        let config = ResolverConfig::default();
        assert_eq!(config.policy(), Ok(BatchPolicy::AllOrNothing));
        assert_eq!(config.verbosity, 0);
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(BatchPolicy::parse("best_effort"), Ok(BatchPolicy::BestEffort));
        assert_eq!(
            BatchPolicy::parse("sometimes"),
            Err(ScheduleError::UnknownBatchPolicy("sometimes".to_string()))
        );
    }
}
