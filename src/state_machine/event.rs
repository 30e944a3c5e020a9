//! Events that advance an exchange

use super::state::FailureKind;

/// Something the runtime observed while working on an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeEvent {
    /// Profile and recent history are loaded
    ContextLoaded,
    /// The completion request has been handed to the client
    RequestSent,
    /// The completion service answered with reply text
    ReplyArrived,
    /// Markup and code blocks were produced
    ReplyRendered,
    /// Markup was split into transport-sized parts
    ReplyChunked,
    /// Every part and code action was handed to the transport
    PartsDelivered,
    /// Both turns were appended to history
    TurnsPersisted,
    /// The exchange cannot continue
    Failed(FailureKind),
}
