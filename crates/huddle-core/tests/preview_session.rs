//! Preview session walkthrough: host starts the deck, simulated participants
//! answer, the host and each participant render the same block differently.

use std::cell::RefCell;
use std::rc::Rc;

use huddle_core::aggregate::analyze;
use huddle_core::display::{UNRESOLVED_MARKER, format_value};
use huddle_core::resolve::{Resolver, StructuredReference};
use huddle_core::session::{Notification, PreviewSession};
use huddle_core::state::{self, Accessor, StateLayout};
use huddle_core::transform::Transformer;
use serde_json::json;

fn deck() -> PreviewSession {
    PreviewSession::new(vec![
        "brainstorm-1".to_string(),
        "review-2".to_string(),
    ])
}

#[test]
fn participants_answer_and_views_differ_by_caller() {
    let mut session = deck();
    session.start();
    for id in ["mock-1", "mock-2", "mock-3"] {
        session.join(id).expect("join");
    }
    session
        .record_response("mock-1", "brainstorm-1", "ideas", json!("Shorter standups"))
        .expect("record");
    session
        .record_response("mock-2", "brainstorm-1", "ideas", json!("Async demos"))
        .expect("record");
    session.sync();

    let resolver = Resolver::new();
    let count = StructuredReference::new("brainstorm-1", Accessor::Responses, Transformer::Count);
    let mine = StructuredReference::new("brainstorm-1", Accessor::Responses, Transformer::Mine);

    let host = session.context_for("host", true);
    assert_eq!(resolver.resolve(&count.clone().into(), &host), json!(2));

    let as_one = session.context_for("mock-1", false);
    let rendered = format_value(&resolver.resolve(&mine.clone().into(), &as_one));
    assert!(rendered.contains("Shorter standups"));
    assert!(!rendered.contains("Async demos"));

    let as_three = session.context_for("mock-3", false);
    assert_eq!(
        format_value(&resolver.resolve(&mine.into(), &as_three)),
        UNRESOLVED_MARKER
    );

    let summary = analyze(session.snapshot(), "brainstorm-1");
    assert!(summary.has_responses);
    assert_eq!(summary.response_count, 2);
    assert!(!summary.has_assignments);
}

#[test]
fn session_snapshot_stays_namespaced() {
    let mut session = deck();
    session.start();
    session.join("mock-1").expect("join");
    session
        .record_assignments("mock-1", "review-2", vec!["item-abc".into()])
        .expect("assign");
    session
        .set_variable("mock-1", "team", json!("blue"))
        .expect("variable");
    session.sync();

    let layout = state::classify(session.snapshot());
    assert!(matches!(layout, StateLayout::Namespaced(_)));
    assert_eq!(layout.namespaces().len(), 2);
    assert_eq!(
        session.snapshot()["review-2"]["assignments"]["mock-1"],
        json!(["item-abc"])
    );
    assert_eq!(session.snapshot()["sharedState"]["mock-1"]["team"], "blue");
}

#[test]
fn subscriber_observes_phase_changes_in_order() {
    let mut session = deck();
    let phases: Rc<RefCell<Vec<String>>> = Rc::default();
    let sink = Rc::clone(&phases);
    session.subscribe(move |notification| {
        if let Notification::StateChanged { snapshot, changed } = notification
            && changed.iter().any(|k| k == "phase")
            && let Some(phase) = state::phase(snapshot)
        {
            sink.borrow_mut().push(phase.to_string());
        }
    });

    session.start();
    session.advance();
    session.go_to("brainstorm-1").expect("go_to");

    assert_eq!(
        phases.borrow().as_slice(),
        ["brainstorm-1", "review-2", "brainstorm-1"]
    );
    let kinds: Vec<_> = session.log().iter().map(|e| e.event.kind.as_str()).collect();
    assert_eq!(kinds, ["start", "phase", "phase"]);
}
