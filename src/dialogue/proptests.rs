//! Property tests over arbitrary event sequences

use proptest::prelude::*;

use super::{
    DialogueMachine, DialogueSettings, DialogueState, Event, MainState, NoInputPolicy, Operation,
    Role, UnhandledEventPolicy,
};

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::AdapterReady),
        Just(Event::AdapterFailed("engine error".into())),
        prop::collection::vec("[a-z:]{1,12}", 0..3).prop_map(Event::ModelsFetched),
        Just(Event::FetchFailed("refused".into())),
        Just(Event::UserClick),
        ("[a-z ]{0,10}", prop::option::of(0.0f32..1.0)).prop_map(|(text, confidence)| {
            Event::Recognized { text, confidence }
        }),
        Just(Event::ListenComplete),
        Just(Event::NoInput),
        Just(Event::SpeakComplete),
        "[a-z ]{0,16}".prop_map(Event::CompletionDone),
        Just(Event::CompletionFailed("timeout".into())),
    ]
}

fn arb_settings() -> impl Strategy<Value = DialogueSettings> {
    (any::<bool>(), any::<bool>()).prop_map(|(skip, defer)| DialogueSettings {
        on_no_input: if skip {
            NoInputPolicy::Skip
        } else {
            NoInputPolicy::Reprompt
        },
        on_unhandled: if defer {
            UnhandledEventPolicy::Defer
        } else {
            UnhandledEventPolicy::Drop
        },
        ..DialogueSettings::default()
    })
}

/// Whether `event` is a completion signal for `operation`
fn completes(operation: Operation, event: &Event) -> bool {
    matches!(
        (operation, event),
        (Operation::Prepare, Event::AdapterReady)
            | (Operation::FetchModels, Event::ModelsFetched(_) | Event::FetchFailed(_))
            | (Operation::Listen, Event::ListenComplete | Event::NoInput)
            | (Operation::Speak, Event::SpeakComplete)
            | (Operation::Complete, Event::CompletionDone(_) | Event::CompletionFailed(_))
    )
}

proptest! {
    #[test]
    fn prop_single_outstanding_operation(
        settings in arb_settings(),
        events in prop::collection::vec(arb_event(), 0..64),
    ) {
        let mut m = DialogueMachine::new(settings);
        let first = m.start();
        prop_assert_eq!(first.map(|i| i.operation()), m.outstanding());

        for event in events {
            let before = m.outstanding();
            let intent = m.handle(event.clone());

            if let Some(intent) = &intent {
                if let Some(op) = before {
                    prop_assert!(completes(op, &event), "{:?} emitted while {:?} outstanding", intent, op);
                }
                prop_assert_eq!(m.outstanding(), Some(intent.operation()));
            }
        }
    }

    #[test]
    fn prop_transcript_append_only(
        settings in arb_settings(),
        events in prop::collection::vec(arb_event(), 0..64),
    ) {
        let mut m = DialogueMachine::new(settings);
        m.start();
        let mut previous = m.transcript().snapshot();

        for event in events {
            m.handle(event);
            let current = m.transcript().snapshot();
            prop_assert!(current.starts_with(&previous));
            previous = current;
        }
    }

    #[test]
    fn prop_speaking_follows_assistant_reply(
        settings in arb_settings(),
        events in prop::collection::vec(arb_event(), 0..64),
    ) {
        let mut m = DialogueMachine::new(settings);
        m.start();

        for event in events {
            m.handle(event);
            if m.state() == DialogueState::Main(MainState::Speaking) {
                let last = m.transcript().last();
                prop_assert_eq!(last.map(|msg| msg.role), Some(Role::Assistant));
            }
        }
    }

    #[test]
    fn prop_never_parked(
        settings in arb_settings(),
        events in prop::collection::vec(arb_event(), 0..64),
    ) {
        let mut m = DialogueMachine::new(settings);
        m.start();

        for event in events {
            m.handle(event);
            let idle_ok = matches!(
                m.state(),
                DialogueState::Failed | DialogueState::Main(MainState::Prompt)
            );
            prop_assert!(idle_ok || m.outstanding().is_some(), "parked in {}", m.state());
            prop_assert!(m.deferred_len() <= super::machine::MAX_DEFERRED);
        }
    }
}
