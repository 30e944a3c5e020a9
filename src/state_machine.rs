//! Per-exchange state machine
//!
//! One exchange moves through a fixed linear sequence of phases. The
//! transition function is pure; the runtime drives it and performs the I/O
//! each phase implies.

pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use event::ExchangeEvent;
pub use state::{Exchange, ExchangePhase, FailureKind};
pub use transition::{transition, TransitionError};
