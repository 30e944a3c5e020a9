//! Property-based tests for the exchange state machine

use super::*;
use proptest::prelude::*;

fn arb_failure_kind() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::TransportDownload),
        Just(FailureKind::Decode),
        Just(FailureKind::CompletionApi),
        Just(FailureKind::Storage),
        Just(FailureKind::AttachmentTooLarge),
    ]
}

fn arb_event() -> impl Strategy<Value = ExchangeEvent> {
    prop_oneof![
        Just(ExchangeEvent::ContextLoaded),
        Just(ExchangeEvent::RequestSent),
        Just(ExchangeEvent::ReplyArrived),
        Just(ExchangeEvent::ReplyRendered),
        Just(ExchangeEvent::ReplyChunked),
        Just(ExchangeEvent::PartsDelivered),
        Just(ExchangeEvent::TurnsPersisted),
        arb_failure_kind().prop_map(ExchangeEvent::Failed),
    ]
}

const LINEAR: [ExchangePhase; 8] = [
    ExchangePhase::Received,
    ExchangePhase::ContextBuilt,
    ExchangePhase::CompletionRequested,
    ExchangePhase::ReplyReceived,
    ExchangePhase::Rendered,
    ExchangePhase::Chunked,
    ExchangePhase::Delivered,
    ExchangePhase::Persisted,
];

proptest! {
    /// Whatever events arrive, the visited phases are a prefix of the
    /// linear sequence, optionally followed by one failure.
    #[test]
    fn trail_is_linear_prefix(events in prop::collection::vec(arb_event(), 0..30)) {
        let mut exchange = Exchange::new(1);
        for event in events {
            let _ = exchange.apply(event);
        }

        let trail = exchange.trail();
        let (last, init) = trail.split_last().unwrap();
        let success_len = if matches!(last, ExchangePhase::Failed(_)) { init.len() } else { trail.len() };
        prop_assert_eq!(&trail[..success_len], &LINEAR[..success_len]);
        prop_assert!(trail.len() <= LINEAR.len());
    }

    /// Persisted is reached only when every success event was seen in order
    #[test]
    fn persisted_implies_full_sequence(events in prop::collection::vec(arb_event(), 0..30)) {
        let mut exchange = Exchange::new(1);
        for event in events {
            let _ = exchange.apply(event);
        }
        if exchange.phase() == ExchangePhase::Persisted {
            prop_assert_eq!(exchange.trail(), &LINEAR[..]);
        }
    }

    /// Terminal phases reject every event
    #[test]
    fn terminal_phases_are_final(kind in arb_failure_kind(), event in arb_event()) {
        for phase in [ExchangePhase::Persisted, ExchangePhase::Failed(kind)] {
            prop_assert_eq!(transition(phase, event), Err(TransitionError::Finished(phase)));
        }
    }

    /// Failure is reachable from every non-terminal phase
    #[test]
    fn failure_from_any_live_phase(idx in 0usize..7, kind in arb_failure_kind()) {
        prop_assert_eq!(
            transition(LINEAR[idx], ExchangeEvent::Failed(kind)),
            Ok(ExchangePhase::Failed(kind))
        );
    }
}
