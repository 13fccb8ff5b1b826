use nova_batch_eval::{BatchAvailability, ResponseEntry};
use nova_jdwp::{JdwpValue, MockCall, MockReturn, TAG_ARRAY};
use pretty_assertions::assert_eq;

use super::support::{debuggee_with_helper, err, object, ok, reply_text, Harness, THROWING};

#[test]
fn results_are_correlated_by_submission_order() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    h.submit(&scope, "a", object(3));
    h.submit(&scope, "b", object(THROWING));
    h.submit(&scope, "c", object(1));
    // Nothing is delivered before the flush command runs.
    assert!(h.outcomes().is_empty());

    h.run();

    assert_eq!(
        h.outcomes(),
        vec![
            ok("a", "obj#3"),
            err("b", "Method threw 'java.lang.IllegalStateException' exception."),
            ok("c", "obj#1"),
        ]
    );
    assert_eq!(h.batch_calls(), 1);
    assert!(h.to_string_calls().is_empty());
}

#[test]
fn helper_receives_values_in_submission_order() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    for id in [7, 2, 9] {
        h.submit(&scope, &id.to_string(), object(id));
    }
    h.run();

    let stored: Vec<_> = h
        .jdwp()
        .calls()
        .iter()
        .filter_map(|call| match call {
            MockCall::SetArrayValues { values, .. } => Some(values.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(stored, vec![vec![object(7), object(2), object(9)]]);

    let lengths: Vec<_> = h
        .jdwp()
        .calls()
        .iter()
        .filter_map(|call| match call {
            MockCall::NewArray { class, length } => Some((class.clone(), *length)),
            _ => None,
        })
        .collect();
    assert_eq!(lengths, vec![("java.lang.Object[]".to_string(), 3)]);

    let passes_one_array = h.jdwp().calls().iter().any(|call| {
        matches!(call, MockCall::InvokeStatic { args, .. }
            if matches!(args.as_slice(), [JdwpValue::Object { tag: TAG_ARRAY, .. }]))
    });
    assert!(passes_one_array);
}

#[test]
fn one_flush_command_per_scope() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    for id in 1..=5 {
        h.submit(&scope, &id.to_string(), object(id));
    }

    assert_eq!(h.sender.enqueued(), 1);
    assert_eq!(h.process.batch_evaluator().pending_len(scope.id()), 5);

    assert_eq!(h.run(), 1);
    assert_eq!(h.batch_calls(), 1);
    assert_eq!(h.outcomes().len(), 5);
    assert!(!h.process.batch_evaluator().has_pending());
}

#[test]
fn single_request_is_still_a_batch() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    h.submit(&scope, "only", object(4));
    h.run();

    assert_eq!(h.outcomes(), vec![ok("only", "obj#4")]);
    assert_eq!(h.batch_calls(), 1);
}

#[test]
fn scopes_are_batched_separately() {
    let mut h = Harness::new(debuggee_with_helper());
    let first = h.suspend();
    let second = h.suspend();
    h.submit(&first, "a", object(1));
    h.submit(&second, "b", object(2));
    h.submit(&first, "c", object(3));

    assert_eq!(h.sender.enqueued(), 2);
    h.run();

    assert_eq!(h.batch_calls(), 2);
    assert_eq!(
        h.outcomes(),
        vec![ok("a", "obj#1"), ok("c", "obj#3"), ok("b", "obj#2")]
    );
}

#[test]
fn submissions_after_a_flush_start_a_new_batch() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    h.submit(&scope, "a", object(1));
    h.run();
    h.submit(&scope, "b", object(2));
    h.run();

    assert_eq!(h.sender.enqueued(), 2);
    assert_eq!(h.batch_calls(), 2);
    assert_eq!(h.outcomes(), vec![ok("a", "obj#1"), ok("b", "obj#2")]);
}

#[test]
fn error_entries_become_method_exception_text() {
    let mut jdwp = debuggee_with_helper();
    jdwp.set_batch_handler(|_| {
        Ok(MockReturn::Text(reply_text(&[
            ResponseEntry::error("java.lang.IllegalStateException"),
            ResponseEntry::success("fine"),
        ])))
    });
    let mut h = Harness::new(jdwp);
    let scope = h.suspend();
    h.submit(&scope, "a", object(1));
    h.submit(&scope, "b", object(2));
    h.run();

    assert_eq!(
        h.outcomes(),
        vec![
            err("a", "Method threw 'java.lang.IllegalStateException' exception."),
            ok("b", "fine"),
        ]
    );
}

#[test]
fn reply_is_pinned_while_read_and_released_after() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    h.submit(&scope, "a", object(1));
    h.run();

    let pinned: Vec<_> = h
        .jdwp()
        .calls()
        .iter()
        .filter_map(|call| match call {
            MockCall::DisableCollection(id) => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(pinned.len(), 1);
    assert!(h
        .jdwp()
        .calls()
        .contains(&MockCall::EnableCollection(pinned[0])));
    assert!(!h.jdwp().is_collection_disabled(pinned[0]));
}

#[test]
fn primitives_render_locally() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    h.submit(&scope, "n", JdwpValue::Int(42));
    h.submit(&scope, "flag", JdwpValue::Boolean(true));
    h.run();

    assert_eq!(h.outcomes(), vec![ok("n", "42"), ok("flag", "true")]);
    assert!(h.jdwp().calls().is_empty());
    assert_eq!(
        h.process.batch_evaluator().availability(),
        BatchAvailability::Unknown
    );
}

#[test]
fn probe_reports_availability_to_callers() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    let context = h.process.evaluation_context(scope, None);

    assert!(h.process.is_batching_available(&context));
    assert!(h.process.is_batching_available(&context));
    assert_eq!(h.helper_lookups(), 1);
    assert_eq!(
        h.process.batch_evaluator().availability(),
        BatchAvailability::Available
    );
}
