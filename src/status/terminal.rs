//! Classification of an observed status against expected and unexpected terminal sets.

use std::fmt;

use crate::api::StatusEnum;
use crate::error::{Error, Result};
use crate::retry::Attempt;

/// Where an observed status falls relative to a terminal set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Expected,
    Unexpected,
    InProgress,
}

/// Expected and unexpected terminal statuses for one kind of object.
///
/// The two sets never share a status. Anything outside both is still in progress.
#[derive(Clone, Debug, PartialEq)]
pub struct TerminalStatusSet<S: StatusEnum> {
    kind: &'static str,
    expected: Vec<S>,
    unexpected: Vec<S>,
}

impl<S: StatusEnum> TerminalStatusSet<S> {
    pub fn new(kind: &'static str, expected: Vec<S>, unexpected: Vec<S>) -> Result<Self> {
        if expected.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{kind} status set needs at least one expected status"
            )));
        }
        if let Some(overlap) = expected.iter().find(|s| unexpected.contains(s)) {
            return Err(Error::InvalidConfig(format!(
                "{kind} status {overlap} is both expected and unexpected"
            )));
        }
        Ok(Self::from_parts(kind, expected, unexpected))
    }

    /// Built-in sets; disjointness is covered by tests.
    pub(crate) fn from_parts(kind: &'static str, expected: Vec<S>, unexpected: Vec<S>) -> Self {
        debug_assert!(expected.iter().all(|s| !unexpected.contains(s)));
        Self {
            kind,
            expected,
            unexpected,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn expected(&self) -> &[S] {
        &self.expected
    }

    pub fn unexpected(&self) -> &[S] {
        &self.unexpected
    }

    pub fn classification(&self, status: S) -> Classification {
        if self.expected.contains(&status) {
            Classification::Expected
        } else if self.unexpected.contains(&status) {
            Classification::Unexpected
        } else {
            Classification::InProgress
        }
    }

    /// Turn one observation of `name` into a retry attempt.
    pub fn classify(&self, name: &str, status: S, reason: &str) -> Attempt<S> {
        match self.classification(status) {
            Classification::Expected => Attempt::Done(status),
            Classification::Unexpected => Attempt::failed_with(
                status,
                Error::UnexpectedStatus {
                    kind: self.kind,
                    name: name.to_string(),
                    expected: self.expected_display(),
                    actual: status.to_string(),
                    reason: reason.to_string(),
                },
            ),
            Classification::InProgress => Attempt::pending_with(
                status,
                format!(
                    "{} status for [{name}] is [{status}], waiting for {}",
                    self.kind,
                    self.expected_display()
                ),
            ),
        }
    }

    fn expected_display(&self) -> String {
        DisplayList(&self.expected).to_string()
    }
}

struct DisplayList<'a, S>(&'a [S]);

impl<S: fmt::Display> fmt::Display for DisplayList<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{s}")?;
        }
        f.write_str("]")
    }
}
