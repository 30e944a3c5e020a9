//! Pure transition function

use super::event::ExchangeEvent;
use super::state::ExchangePhase;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Exchange already finished in phase {0}")]
    Finished(ExchangePhase),
    #[error("Event {event:?} is not valid in phase {phase}")]
    OutOfOrder {
        phase: ExchangePhase,
        event: ExchangeEvent,
    },
}

/// Next phase for `event` in `phase`.
///
/// Success events advance exactly one step along
/// `Received -> ContextBuilt -> CompletionRequested -> ReplyReceived ->
/// Rendered -> Chunked -> Delivered -> Persisted`. `Failed` is accepted from
/// every non-terminal phase. Terminal phases accept nothing.
pub fn transition(
    phase: ExchangePhase,
    event: ExchangeEvent,
) -> Result<ExchangePhase, TransitionError> {
    use ExchangeEvent as E;
    use ExchangePhase as P;

    if phase.is_terminal() {
        return Err(TransitionError::Finished(phase));
    }

    match (phase, event) {
        (_, E::Failed(kind)) => Ok(P::Failed(kind)),
        (P::Received, E::ContextLoaded) => Ok(P::ContextBuilt),
        (P::ContextBuilt, E::RequestSent) => Ok(P::CompletionRequested),
        (P::CompletionRequested, E::ReplyArrived) => Ok(P::ReplyReceived),
        (P::ReplyReceived, E::ReplyRendered) => Ok(P::Rendered),
        (P::Rendered, E::ReplyChunked) => Ok(P::Chunked),
        (P::Chunked, E::PartsDelivered) => Ok(P::Delivered),
        (P::Delivered, E::TurnsPersisted) => Ok(P::Persisted),
        (phase, event) => Err(TransitionError::OutOfOrder { phase, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{Exchange, FailureKind};

    const HAPPY_PATH: [ExchangeEvent; 7] = [
        ExchangeEvent::ContextLoaded,
        ExchangeEvent::RequestSent,
        ExchangeEvent::ReplyArrived,
        ExchangeEvent::ReplyRendered,
        ExchangeEvent::ReplyChunked,
        ExchangeEvent::PartsDelivered,
        ExchangeEvent::TurnsPersisted,
    ];

    #[test]
    fn test_happy_path_reaches_persisted() {
        let mut exchange = Exchange::new(1);
        for event in HAPPY_PATH {
            exchange.apply(event).unwrap();
        }
        assert_eq!(exchange.phase(), ExchangePhase::Persisted);
        assert_eq!(
            exchange.trail(),
            &[
                ExchangePhase::Received,
                ExchangePhase::ContextBuilt,
                ExchangePhase::CompletionRequested,
                ExchangePhase::ReplyReceived,
                ExchangePhase::Rendered,
                ExchangePhase::Chunked,
                ExchangePhase::Delivered,
                ExchangePhase::Persisted,
            ]
        );
    }

    #[test]
    fn test_completion_failure_is_terminal() {
        let mut exchange = Exchange::new(1);
        exchange.apply(ExchangeEvent::ContextLoaded).unwrap();
        exchange.apply(ExchangeEvent::RequestSent).unwrap();
        exchange
            .apply(ExchangeEvent::Failed(FailureKind::CompletionApi))
            .unwrap();

        assert_eq!(
            exchange.phase(),
            ExchangePhase::Failed(FailureKind::CompletionApi)
        );
        let err = exchange.apply(ExchangeEvent::ReplyArrived).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Finished(ExchangePhase::Failed(FailureKind::CompletionApi))
        );
    }

    #[test]
    fn test_failure_before_context() {
        assert_eq!(
            transition(
                ExchangePhase::Received,
                ExchangeEvent::Failed(FailureKind::AttachmentTooLarge)
            ),
            Ok(ExchangePhase::Failed(FailureKind::AttachmentTooLarge))
        );
    }

    #[test]
    fn test_skipping_a_phase_is_rejected() {
        let err = transition(ExchangePhase::ContextBuilt, ExchangeEvent::ReplyArrived).unwrap_err();
        assert!(matches!(err, TransitionError::OutOfOrder { .. }));
    }

    #[test]
    fn test_rejected_event_leaves_exchange_unchanged() {
        let mut exchange = Exchange::new(1);
        assert!(exchange.apply(ExchangeEvent::TurnsPersisted).is_err());
        assert_eq!(exchange.phase(), ExchangePhase::Received);
        assert_eq!(exchange.trail().len(), 1);
    }

    #[test]
    fn test_persisted_rejects_failure() {
        assert_eq!(
            transition(
                ExchangePhase::Persisted,
                ExchangeEvent::Failed(FailureKind::Storage)
            ),
            Err(TransitionError::Finished(ExchangePhase::Persisted))
        );
    }
}
