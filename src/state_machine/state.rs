//! Exchange phases

use super::event::ExchangeEvent;
use super::transition::{transition, TransitionError};
use crate::store::UserId;
use std::fmt;

/// Why an exchange ended in [`ExchangePhase::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Attachment could not be fetched from the transport
    TransportDownload,
    /// Attachment bytes are not text under any supported encoding
    Decode,
    /// Completion call failed, timed out or returned garbage
    CompletionApi,
    /// Profile store I/O failed
    Storage,
    /// Attachment exceeds the size cap; rejected before any I/O
    AttachmentTooLarge,
}

/// Where an exchange currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangePhase {
    /// Incoming message accepted, nothing loaded yet
    #[default]
    Received,
    /// Profile and history loaded, request assembled
    ContextBuilt,
    /// Completion call in flight
    CompletionRequested,
    /// Reply text in hand
    ReplyReceived,
    /// Reply converted to markup, code blocks indexed
    Rendered,
    /// Markup split into parts
    Chunked,
    /// Parts sent to the user
    Delivered,
    /// Both turns persisted (terminal)
    Persisted,
    /// Exchange dropped; history untouched (terminal)
    Failed(FailureKind),
}

impl ExchangePhase {
    /// No transition leaves a terminal phase
    pub fn is_terminal(self) -> bool {
        matches!(self, ExchangePhase::Persisted | ExchangePhase::Failed(_))
    }

    pub fn name(self) -> &'static str {
        match self {
            ExchangePhase::Received => "received",
            ExchangePhase::ContextBuilt => "context_built",
            ExchangePhase::CompletionRequested => "completion_requested",
            ExchangePhase::ReplyReceived => "reply_received",
            ExchangePhase::Rendered => "rendered",
            ExchangePhase::Chunked => "chunked",
            ExchangePhase::Delivered => "delivered",
            ExchangePhase::Persisted => "persisted",
            ExchangePhase::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for ExchangePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangePhase::Failed(kind) => write!(f, "failed({kind:?})"),
            other => f.write_str(other.name()),
        }
    }
}

/// One in-flight exchange and the phases it has passed through
#[derive(Debug, Clone)]
pub struct Exchange {
    pub user_id: UserId,
    phase: ExchangePhase,
    trail: Vec<ExchangePhase>,
}

impl Exchange {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            phase: ExchangePhase::Received,
            trail: vec![ExchangePhase::Received],
        }
    }

    pub fn phase(&self) -> ExchangePhase {
        self.phase
    }

    /// Every phase visited, oldest first, including the current one
    pub fn trail(&self) -> &[ExchangePhase] {
        &self.trail
    }

    /// Advance by `event`. On error the exchange is left where it was.
    pub fn apply(&mut self, event: ExchangeEvent) -> Result<ExchangePhase, TransitionError> {
        let next = transition(self.phase, event)?;
        tracing::debug!(
            user_id = self.user_id,
            from = %self.phase,
            to = %next,
            "Exchange transition"
        );
        self.phase = next;
        self.trail.push(next);
        Ok(next)
    }
}
