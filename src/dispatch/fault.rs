//! Classification of hook failures.
//!
//! A hook error whose kind tag is listed here is treated as a programming
//! fault: its message is hidden behind a generic one and, during
//! validation, the status is forced to 500. Panics always count as faults.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::{
    config,
    core::error::{HookError, REFERENCE_ERROR, TYPE_ERROR},
};

pub const DEFAULT_INTERNAL_KINDS: [&str; 2] = [TYPE_ERROR, REFERENCE_ERROR];

pub(crate) static DEFAULT_POLICY: Lazy<FaultPolicy> = Lazy::new(FaultPolicy::default);

#[derive(Debug, Clone, PartialEq)]
pub struct FaultPolicy {
    internal_kinds: HashSet<String>,
    catch_panics: bool,
}

impl FaultPolicy {
    pub fn new<I, K>(internal_kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            internal_kinds: internal_kinds.into_iter().map(Into::into).collect(),
            catch_panics: true,
        }
    }

    /// When disabled, a panicking hook unwinds through the dispatcher.
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    pub fn catch_panics(&self) -> bool {
        self.catch_panics
    }

    pub fn is_internal(&self, error: &HookError) -> bool {
        error.is_panic() || self.internal_kinds.contains(error.kind())
    }
}

impl Default for FaultPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_INTERNAL_KINDS)
    }
}

impl From<&config::Faults> for FaultPolicy {
    fn from(faults: &config::Faults) -> Self {
        Self::new(faults.internal_kinds.iter().cloned()).with_catch_panics(faults.catch_panics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kinds() {
        let policy = FaultPolicy::default();

        assert!(policy.is_internal(&HookError::type_error("x")));
        assert!(policy.is_internal(&HookError::reference_error("x")));
        assert!(policy.is_internal(&HookError::panic("x")));
        assert!(!policy.is_internal(&HookError::new("Wrong name!")));
        assert!(policy.catch_panics());
    }

    #[test]
    fn test_custom_kinds() {
        let policy = FaultPolicy::new(["DatabaseError"]).with_catch_panics(false);

        assert!(policy.is_internal(&HookError::new("x").with_kind("DatabaseError")));
        assert!(!policy.is_internal(&HookError::type_error("x")));
        assert!(policy.is_internal(&HookError::panic("x")));
        assert!(!policy.catch_panics());
    }

    #[test]
    fn test_from_config() {
        let faults = config::Faults {
            internal_kinds: vec!["TypeError".to_string()],
            catch_panics: false,
        };
        let policy = FaultPolicy::from(&faults);

        assert!(policy.is_internal(&HookError::type_error("x")));
        assert!(!policy.is_internal(&HookError::reference_error("x")));
        assert!(!policy.catch_panics());
    }
}
