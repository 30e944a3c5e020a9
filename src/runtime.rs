//! Runtime for processing exchanges
//!
//! One incoming message becomes one exchange: load context, call the
//! completion service, render, deliver, persist. The executor is generic over
//! its I/O so tests can swap in mocks.

mod error;
mod executor;
mod locks;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use error::CodeFileError;
pub use executor::{ConversationRuntime, DocumentUpload, RuntimeSettings};
pub use traits::*;

use crate::store::JsonProfileStore;
use crate::telegram::TelegramTransport;
use std::sync::Arc;

/// Type alias for production runtime with concrete implementations
pub type ProductionRuntime =
    ConversationRuntime<JsonProfileStore, ServiceLlmClient, Arc<TelegramTransport>>;
