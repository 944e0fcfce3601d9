//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_response_type() -> impl Strategy<Value = ResponseType> {
    prop_oneof![
        Just(ResponseType::Positive),
        Just(ResponseType::Neutral),
        Just(ResponseType::NegativeObjection),
    ]
}

fn arb_response_option() -> impl Strategy<Value = ProspectResponseOption> {
    ("[a-zA-Z ,?.!]{1,40}", arb_response_type()).prop_map(|(response_text, response_type)| {
        ProspectResponseOption {
            response_text,
            response_type,
        }
    })
}

fn arb_script_turn() -> impl Strategy<Value = ScriptTurn> {
    (
        "[a-zA-Z ,?.!]{1,80}",
        proptest::collection::vec(arb_response_option(), 2..=4),
    )
        .prop_map(|(salesperson_utterance, prospect_response_options)| ScriptTurn {
            salesperson_utterance,
            prospect_response_options,
        })
}

fn arb_business() -> impl Strategy<Value = BusinessInfo> {
    ("[a-zA-Z ]{1,20}", "[a-zA-Z ]{1,20}", "[a-zA-Z ]{1,40}", "[a-zA-Z ]{1,40}").prop_map(
        |(user_name, business_name, product_service, sales_goals)| BusinessInfo {
            user_name,
            business_name,
            product_service,
            sales_goals,
        },
    )
}

fn arb_state() -> impl Strategy<Value = ScriptState> {
    prop_oneof![
        Just(ScriptState::AwaitingInput),
        arb_business().prop_map(|business| ScriptState::ResolvingContext { business }),
        Just(ScriptState::GeneratingOpening),
        arb_script_turn().prop_map(|turn| ScriptState::TurnOpen { turn }),
        arb_response_option().prop_map(|last_response| ScriptState::TurnResolving { last_response }),
        ("[a-zA-Z ]{1,30}", any::<bool>(), arb_response_option()).prop_map(
            |(message, retryable, last_response)| ScriptState::Stalled {
                message,
                retryable,
                last_response,
            }
        ),
    ]
}

fn arb_busy_state() -> impl Strategy<Value = ScriptState> {
    prop_oneof![
        arb_business().prop_map(|business| ScriptState::ResolvingContext { business }),
        Just(ScriptState::GeneratingOpening),
        arb_response_option().prop_map(|last_response| ScriptState::TurnResolving { last_response }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Clear always lands in AwaitingInput with a ClearSession effect,
    /// regardless of the state it was issued from.
    #[test]
    fn prop_clear_always_resets(state in arb_state()) {
        let result = transition(&state, Event::ClearRequested).unwrap();
        prop_assert_eq!(result.new_state, ScriptState::AwaitingInput);
        prop_assert!(result.effects.iter().any(|e| matches!(e, Effect::ClearSession)));
    }

    /// Busy states reject a response selection without changing state.
    #[test]
    fn prop_busy_states_reject_selection(
        state in arb_busy_state(),
        option in arb_response_option(),
    ) {
        let result = transition(&state, Event::ResponseSelected { option });
        prop_assert!(matches!(result, Err(TransitionError::RequestInFlight)));
    }

    /// Only AwaitingInput accepts a start request.
    #[test]
    fn prop_start_requires_awaiting_input(
        state in arb_state(),
        business in arb_business(),
    ) {
        let event = Event::StartRequested {
            business,
            customer: crate::resolver::CustomerInput::Text { text: "Acme".to_string() },
        };
        let result = transition(&state, event);
        if state == ScriptState::AwaitingInput {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(matches!(result, Err(TransitionError::ConversationActive)));
        }
    }

    /// Selecting a response on an open turn appends exactly that turn,
    /// completed with exactly that option, with its options cleared.
    #[test]
    fn prop_selection_appends_completed_turn(
        turn in arb_script_turn(),
        option in arb_response_option(),
    ) {
        let state = ScriptState::TurnOpen { turn: turn.clone() };
        let result = transition(&state, Event::ResponseSelected { option: option.clone() }).unwrap();

        prop_assert_eq!(
            &result.new_state,
            &ScriptState::TurnResolving { last_response: option.clone() }
        );

        let appended = result.effects.iter().find_map(|e| match e {
            Effect::AppendTurn { turn } => Some(turn),
            _ => None,
        }).expect("AppendTurn effect");
        prop_assert!(appended.prospect_response_options.is_empty());
        prop_assert_eq!(&appended.chosen_prospect_response, &option);
        prop_assert_eq!(&appended.salesperson_utterance, &turn.salesperson_utterance);

        let requested = result.effects.iter().find_map(|e| match e {
            Effect::RequestNextTurn { last_response } => Some(last_response),
            _ => None,
        }).expect("RequestNextTurn effect");
        prop_assert_eq!(requested, &option);
    }

    /// A generated turn opens in both the opening and next-turn paths.
    #[test]
    fn prop_generated_turn_opens(turn in arb_script_turn(), last in arb_response_option()) {
        for state in [ScriptState::GeneratingOpening, ScriptState::TurnResolving { last_response: last.clone() }] {
            let result = transition(&state, Event::TurnGenerated { turn: turn.clone() }).unwrap();
            prop_assert_eq!(result.new_state, ScriptState::TurnOpen { turn: turn.clone() });
        }
    }

    /// A stalled conversation retries with the same last response.
    #[test]
    fn prop_retry_preserves_last_response(
        message in "[a-zA-Z ]{1,30}",
        retryable in any::<bool>(),
        last in arb_response_option(),
    ) {
        let state = ScriptState::Stalled {
            message,
            retryable,
            last_response: last.clone(),
        };
        let result = transition(&state, Event::RetryRequested).unwrap();
        prop_assert_eq!(
            result.new_state,
            ScriptState::TurnResolving { last_response: last.clone() }
        );
        let requested = result.effects.iter().find_map(|e| match e {
            Effect::RequestNextTurn { last_response } => Some(last_response),
            _ => None,
        }).expect("RequestNextTurn effect");
        prop_assert_eq!(requested, &last);
    }

    /// Collaborator results never error out of the machine; states that are
    /// not expecting one discard it unchanged.
    #[test]
    fn prop_collaborator_results_never_error(
        state in arb_state(),
        turn in arb_script_turn(),
    ) {
        let result = transition(&state, Event::TurnGenerated { turn });
        prop_assert!(result.is_ok());
    }
}
