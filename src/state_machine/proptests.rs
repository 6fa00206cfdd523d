//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::protocol::{
    ActionOutcome, AuditEntry, Candidate, ClientAction, ResultsSnapshot, ServerEvent,
};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> SessionContext {
    SessionContext::default()
}

const CANDIDATE_IDS: [&str; 4] = ["c1", "c2", "c3", "c4"];

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_candidate_id() -> impl Strategy<Value = String> {
    proptest::sample::select(CANDIDATE_IDS.to_vec()).prop_map(String::from)
}

fn arb_snapshot() -> impl Strategy<Value = ResultsSnapshot> {
    (
        proptest::sample::subsequence(CANDIDATE_IDS.to_vec(), 0..=CANDIDATE_IDS.len()),
        proptest::collection::vec(0u64..50, CANDIDATE_IDS.len()),
        0u64..100,
    )
        .prop_map(|(ids, votes, registered)| {
            let candidates: Vec<Candidate> = ids
                .iter()
                .zip(votes)
                .map(|(id, votes)| Candidate {
                    id: (*id).to_string(),
                    name: format!("Candidate {id}"),
                    party: None,
                    image: None,
                    votes,
                })
                .collect();
            let total: u64 = candidates.iter().map(|c| c.votes).sum();
            ResultsSnapshot {
                total_votes: total,
                registered_voters: registered.max(total),
                voters_who_voted: total,
                candidates,
            }
        })
}

fn arb_outcome() -> impl Strategy<Value = ActionOutcome> {
    prop_oneof![
        Just(ActionOutcome::accepted()),
        "[a-zA-Z ]{1,20}".prop_map(|m| ActionOutcome::accepted().with_message(m)),
        "[a-zA-Z ]{1,20}".prop_map(ActionOutcome::rejected),
        Just(ActionOutcome {
            success: false,
            error: None,
            message: None,
        }),
    ]
}

fn arb_audit_entry() -> impl Strategy<Value = AuditEntry> {
    ("[a-f0-9]{16}", "V[0-9]{1,3}", "[A-Z][a-z]{2,8}", arb_candidate_id()).prop_map(
        |(hashed_voter, real_voter_id, voter_name, candidate_id)| AuditEntry {
            candidate_name: format!("Candidate {candidate_id}"),
            hashed_voter,
            real_voter_id,
            voter_name,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            candidate_id: Some(candidate_id),
        },
    )
}

fn arb_server_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        arb_snapshot().prop_map(ServerEvent::InitialState),
        arb_snapshot().prop_map(ServerEvent::ResultsUpdate),
        arb_outcome().prop_map(ServerEvent::RegisterResult),
        arb_outcome().prop_map(ServerEvent::VoteResult),
        proptest::collection::vec(arb_audit_entry(), 0..3).prop_map(ServerEvent::Audit),
    ]
}

fn arb_phase() -> impl Strategy<Value = Phase> {
    prop_oneof![
        Just(Phase::AwaitingIdentity),
        Just(Phase::AwaitingVote),
        Just(Phase::AwaitingConfirmation),
        Just(Phase::AuditView),
    ]
}

fn arb_connection() -> impl Strategy<Value = ConnectionStatus> {
    prop_oneof![
        Just(ConnectionStatus::Connecting),
        Just(ConnectionStatus::Connected),
        (1u32..5).prop_map(|attempt| ConnectionStatus::Reconnecting { attempt }),
    ]
}

fn arb_user_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        ("(V[0-9]{1,2})?", "([A-Z][a-z]{1,6})?")
            .prop_map(|(id, name)| Event::submit_identity(id, name)),
        arb_candidate_id().prop_map(Event::select),
        Just(Event::ConfirmVote),
        Just(Event::RequestAudit),
        Just(Event::GoBack),
        Just(Event::ToggleReveal),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => arb_user_event(),
        3 => arb_server_event().prop_map(Event::Server),
        1 => Just(Event::Connected),
        1 => Just(Event::Disconnected { reason: "closed".to_string() }),
        1 => Just(Event::ConnectFailed { error: "refused".to_string() }),
        1 => Just(Event::SendFailed { error: "not connected".to_string() }),
        1 => (1u32..5).prop_map(|attempt| Event::ReconnectDue { attempt }),
        1 => (0u64..5).prop_map(|id| Event::NoticeExpired { id }),
    ]
}

/// Any reachable-looking state, with the phase/identity pairing kept consistent
fn arb_state() -> impl Strategy<Value = SessionState> {
    (
        arb_phase(),
        proptest::option::of(arb_snapshot()),
        arb_connection(),
        any::<bool>(),
    )
        .prop_map(|(phase, snapshot, connection, reveal)| {
            let mut state = SessionState::new().in_phase(phase);
            if phase != Phase::AwaitingIdentity {
                state = state.with_identity("V1", "Ana");
            }
            state.snapshot = snapshot;
            state.connection = connection;
            state.reveal = reveal;
            state
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: At most one selection, always a listed candidate
    #[test]
    fn prop_selection_is_listed_candidate(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = SessionState::new();
        let ctx = test_context();

        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                state = result.new_state;
                if let Some(selected) = &state.selection {
                    let listed = state.snapshot.as_ref().is_some_and(|s| s.contains(selected));
                    prop_assert!(
                        listed,
                        "Selection {} not in snapshot {:?}",
                        selected,
                        state.snapshot
                    );
                }
            }
        }
    }

    // Invariant 2: No vote is sent without a selection and an identity
    #[test]
    fn prop_vote_requires_selection_and_identity(
        events in proptest::collection::vec(arb_event(), 0..30)
    ) {
        let mut state = SessionState::new();
        let ctx = test_context();

        for event in events {
            let before = state.clone();
            if let Ok(result) = transition(&state, &ctx, event) {
                for effect in &result.effects {
                    if let Effect::Send(ClientAction::Vote { voter_id, candidate_id }) = effect {
                        prop_assert_eq!(before.selection.as_deref(), Some(candidate_id.as_str()));
                        prop_assert_eq!(
                            before.identity.as_ref().map(|i| i.voter_id.as_str()),
                            Some(voter_id.as_str())
                        );
                    }
                }
                state = result.new_state;
            }
        }
    }

    // Invariant 3: At most one register/vote in flight
    #[test]
    fn prop_single_action_in_flight(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = SessionState::new();
        let ctx = test_context();

        for event in events {
            let was_busy = state.is_busy();
            if let Ok(result) = transition(&state, &ctx, event) {
                let sends_action = result.effects.iter().any(|e| matches!(
                    e,
                    Effect::Send(
                        ClientAction::Register { .. }
                            | ClientAction::Vote { .. }
                    )
                ));
                prop_assert!(!(was_busy && sends_action), "Second action sent while busy");
                state = result.new_state;
            }
        }
    }

    // Invariant 4: Render effect always emitted on state change
    #[test]
    fn prop_state_changes_render(state in arb_state(), event in arb_event()) {
        if let Ok(result) = transition(&state, &test_context(), event) {
            if result.new_state != state {
                prop_assert!(
                    result.effects.contains(&Effect::Render),
                    "State changed but no Render effect: {:?} -> {:?}",
                    state,
                    result.new_state
                );
            }
        }
    }

    // Invariant 5: Identity is only ever set by an accepted registration
    #[test]
    fn prop_failed_register_leaves_identity_unset(
        voter_id in "V[0-9]{1,3}",
        name in "[A-Z][a-z]{2,8}",
        error in proptest::option::of("[a-zA-Z ]{1,20}"),
    ) {
        let ctx = test_context();
        let state = SessionState::new().connected();
        let waiting = transition(&state, &ctx, Event::submit_identity(voter_id, name))
            .unwrap()
            .new_state;
        let outcome = ActionOutcome { success: false, error, message: None };
        let reply = Event::Server(ServerEvent::RegisterResult(outcome));
        let result = transition(&waiting, &ctx, reply).unwrap();
        prop_assert!(result.new_state.identity.is_none());
        prop_assert_eq!(result.new_state.phase, Phase::AwaitingIdentity);
        prop_assert!(result.new_state.notice.is_some());
    }

    // Invariant 6: Snapshots replace, never merge, and never move the phase
    #[test]
    fn prop_snapshot_replaces(
        state in arb_state(),
        snapshot in arb_snapshot(),
        initial in any::<bool>(),
    ) {
        let event = if initial {
            ServerEvent::InitialState(snapshot.clone())
        } else {
            ServerEvent::ResultsUpdate(snapshot.clone())
        };
        let result = transition(&state, &test_context(), Event::Server(event)).unwrap();
        prop_assert_eq!(result.new_state.snapshot, Some(snapshot));
        prop_assert_eq!(result.new_state.phase, state.phase);
        prop_assert!(result.effects.iter().all(|e| !e.is_send()));
    }

    // Invariant 7: Reveal toggles are involutive and touch nothing else
    #[test]
    fn prop_reveal_toggle_round_trips(state in arb_state()) {
        let ctx = test_context();
        let once = transition(&state, &ctx, Event::ToggleReveal).unwrap().new_state;
        prop_assert_eq!(once.reveal, !state.reveal);
        let twice = transition(&once, &ctx, Event::ToggleReveal).unwrap().new_state;
        prop_assert_eq!(twice, state);
    }

    // Invariant 8: Losing the connection keeps the session and schedules exactly one reconnect
    #[test]
    fn prop_disconnect_preserves_session(state in arb_state()) {
        let result = transition(
            &state,
            &test_context(),
            Event::Disconnected { reason: "gone".to_string() },
        ).unwrap();
        prop_assert_eq!(result.new_state.phase, state.phase);
        prop_assert_eq!(&result.new_state.identity, &state.identity);
        prop_assert_eq!(&result.new_state.snapshot, &state.snapshot);
        prop_assert!(!result.new_state.is_busy());
        let scheduled = result
            .effects
            .iter()
            .filter(|e| matches!(e, Effect::ScheduleReconnect { .. }))
            .count();
        prop_assert_eq!(scheduled, 1);
    }

    // Invariant 9: A closed session accepts nothing
    #[test]
    fn prop_closed_rejects_everything(state in arb_state(), event in arb_event()) {
        let ctx = test_context();
        let closed = transition(&state, &ctx, Event::Shutdown).unwrap().new_state;
        prop_assert_eq!(
            transition(&closed, &ctx, event).unwrap_err(),
            TransitionError::SessionClosed
        );
    }
}
