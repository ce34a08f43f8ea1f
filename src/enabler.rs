//! Gate predicate evaluated against the supervisor's environment.

use serde::{Deserialize, Serialize};

/// The six string relations an [`Enabler`] can test a child's `key` env var against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    EnvEqual,
    EnvNotEqual,
    EnvStartsWith,
    EnvNotStartsWith,
    EnvEndsWith,
    EnvNotEndsWith,
}

/// A declarative predicate over the environment that gates whether a
/// [`crate::config::Command`] is launched or scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Enabler {
    pub key: String,
    pub operator: Operator,
    pub value: String,
}

impl Enabler {
    /// True iff an operator was configured, i.e. this enabler actually gates anything.
    pub fn is_active(&self) -> bool {
        true
    }

    /// Evaluates the predicate against the current process environment.
    pub fn is_true(&self) -> bool {
        self.is_true_against(&|key| std::env::var(key).ok())
    }

    /// Evaluates the predicate against an injected environment reader, so the
    /// six relations can be property-tested without mutating the real process env.
    pub fn is_true_against(&self, read: &dyn Fn(&str) -> Option<String>) -> bool {
        let actual = read(&self.key).unwrap_or_default();
        match self.operator {
            Operator::EnvEqual => actual == self.value,
            Operator::EnvNotEqual => actual != self.value,
            Operator::EnvStartsWith => actual.starts_with(&self.value),
            Operator::EnvNotStartsWith => !actual.starts_with(&self.value),
            Operator::EnvEndsWith => actual.ends_with(&self.value),
            Operator::EnvNotEndsWith => !actual.ends_with(&self.value),
        }
    }
}

/// Gates a unit of work: returns `true` when the work should be skipped, i.e.
/// an enabler is configured and its predicate evaluates false.
pub fn gated_off(enabled: &Option<Enabler>) -> bool {
    matches!(enabled, Some(e) if e.is_active() && !e.is_true())
}
