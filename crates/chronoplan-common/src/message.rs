//! Diagnostic accumulation for the scheduling passes.
//!
//! The driver never aborts on a scenario problem; it records a message and
//! carries on. Ids are stable strings (`"deadlock"`, `"dependency_loop"`, …)
//! so callers and tests can match on them without parsing prose.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One diagnostic emitted by a scheduling pass.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub severity: Severity,
    /// Stable machine-readable id.
    pub id: &'static str,
    pub text: String,
    /// Fully qualified id of the task/resource the message is about, when any.
    pub subject: Option<String>,
    /// Scenario sequence number the message was emitted in, when scenario-scoped.
    pub scenario: Option<usize>,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.id)?;
        if let Some(subject) = &self.subject {
            write!(f, " [{subject}]")?;
        }
        write!(f, ": {}", self.text)
    }
}

/// Append-only log the driver writes into and callers query afterwards.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn info(&mut self, id: &'static str, text: impl Into<String>) {
        self.emit(Severity::Info, id, text, None, None);
    }

    pub fn warning(&mut self, id: &'static str, text: impl Into<String>) {
        self.emit(Severity::Warning, id, text, None, None);
    }

    pub fn error(&mut self, id: &'static str, text: impl Into<String>) {
        self.emit(Severity::Error, id, text, None, None);
    }

    pub fn emit(
        &mut self,
        severity: Severity,
        id: &'static str,
        text: impl Into<String>,
        subject: Option<String>,
        scenario: Option<usize>,
    ) {
        self.messages.push(Message {
            severity,
            id,
            text: text.into(),
            subject,
            scenario,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when any message in the log reached `Error` severity.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    /// Messages carrying the given stable id.
    pub fn with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Message> {
        self.messages.iter().filter(move |m| m.id == id)
    }

    /// Errors scoped to a scenario, used to decide per-scenario success.
    pub fn scenario_has_errors(&self, scenario: usize) -> bool {
        self.messages
            .iter()
            .any(|m| m.severity == Severity::Error && m.scenario == Some(scenario))
    }
}
