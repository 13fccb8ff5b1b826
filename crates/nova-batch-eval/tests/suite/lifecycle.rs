use std::sync::mpsc;
use std::time::Duration;

use nova_batch_eval::{BatchAvailability, ConnectionKind, DebugProcess};
use nova_config::DebuggerConfig;
use nova_jdwp::MockJdwpClient;
use nova_scheduler::{Attachment, DebuggerCommand, ManagerQueue, ManagerThread, SuspensionScope};
use pretty_assertions::assert_eq;

use super::support::{
    debuggee_with_helper, debuggee_without_helper, object, ok, Harness, Outcome,
};

#[test]
fn resumed_scope_delivers_nothing() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    for id in [1, 2, 3] {
        h.submit(&scope, &id.to_string(), object(id));
    }
    scope.invalidate();

    assert_eq!(h.run(), 1);
    assert!(h.outcomes().is_empty());
    assert_eq!(h.process.batch_evaluator().pending_len(scope.id()), 0);
    assert_eq!(h.batch_calls(), 0);
    assert!(h.to_string_calls().is_empty());
}

#[test]
fn cancelling_one_scope_leaves_others_alone() {
    let mut h = Harness::new(debuggee_with_helper());
    let resumed = h.suspend();
    let paused = h.suspend();
    h.submit(&resumed, "a", object(1));
    h.submit(&paused, "b", object(2));
    resumed.invalidate();
    h.run();

    assert_eq!(h.outcomes(), vec![ok("b", "obj#2")]);
    assert!(!h.process.batch_evaluator().has_pending());
}

#[test]
fn individual_commands_are_cancelled_with_their_scope() {
    let mut h = Harness::new(debuggee_without_helper());
    let scope = h.suspend();
    h.submit(&scope, "a", object(1));
    h.submit(&scope, "b", object(2));
    scope.invalidate();
    h.run();

    assert!(h.outcomes().is_empty());
    assert!(h.to_string_calls().is_empty());
}

#[test]
fn detach_discards_pending_batches() {
    let mut h = Harness::new(debuggee_with_helper());
    let scope = h.suspend();
    h.submit(&scope, "a", object(1));
    h.attachment.detach();
    h.process.process_detached();
    h.run();

    assert!(h.outcomes().is_empty());
    assert!(!h.process.batch_evaluator().has_pending());
}

#[test]
fn reattached_scope_does_not_join_a_stale_batch() {
    let mut h = Harness::new(debuggee_with_helper());
    let old = h.suspend();
    h.submit(&old, "stale", object(1));
    h.attachment.detach();
    h.process.process_detached();

    // The stale flush command is still queued when the VM comes back.
    h.attachment = Attachment::new();
    let fresh = h.suspend();
    assert_ne!(old.id(), fresh.id());
    h.submit(&fresh, "fresh", object(2));

    assert_eq!(h.sender.enqueued(), 2);
    assert_eq!(h.run(), 2);
    assert_eq!(h.outcomes(), vec![ok("fresh", "obj#2")]);
    assert!(!h.process.batch_evaluator().has_pending());
}

#[test]
fn probe_runs_once_per_attachment() {
    let mut h = Harness::new(debuggee_with_helper());
    let first = h.suspend();
    let second = h.suspend();
    h.submit(&first, "a", object(1));
    h.submit(&second, "b", object(2));
    h.submit(&first, "c", object(3));
    h.run();
    assert_eq!(h.helper_lookups(), 1);

    h.attachment.detach();
    h.process.process_detached();
    assert_eq!(
        h.process.batch_evaluator().availability(),
        BatchAvailability::Unknown
    );

    h.attachment = Attachment::new();
    let reattached = h.suspend();
    h.submit(&reattached, "d", object(4));
    h.run();

    assert_eq!(h.helper_lookups(), 2);
    assert_eq!(h.outcomes().last(), Some(&ok("d", "obj#4")));
}

#[test]
fn threadless_scope_does_not_consume_the_probe() {
    let mut h = Harness::new(debuggee_with_helper());
    let threadless = h.attachment.suspend(None);
    let context = h.process.evaluation_context(threadless, None);
    assert!(!h.process.is_batching_available(&context));
    assert_eq!(
        h.process.batch_evaluator().availability(),
        BatchAvailability::Unknown
    );

    let scope = h.suspend();
    h.submit(&scope, "a", object(1));
    h.run();
    assert_eq!(h.outcomes(), vec![ok("a", "obj#1")]);
    assert_eq!(h.batch_calls(), 1);
}

#[test]
fn submissions_after_queue_shutdown_are_dropped() {
    let (sender, _queue) = ManagerQueue::new();
    let mut process = DebugProcess::new(
        debuggee_with_helper(),
        DebuggerConfig::default(),
        ConnectionKind::Local,
        &sender,
    );
    drop(sender);

    let scope = Attachment::new().suspend(Some(1));
    let context = process.evaluation_context(scope, None);
    process.submit(
        object(1),
        context,
        |text: String| panic!("unexpected success: {text}"),
        |message: String| panic!("unexpected error: {message}"),
    );

    assert!(process.commands().is_none());
    assert!(process.gateway().calls().is_empty());
}

/// Submits values from inside the manager thread, the way a variables view
/// would.
struct SubmitAll {
    scope: SuspensionScope,
    ids: Vec<u64>,
    results: mpsc::Sender<Outcome>,
}

impl DebuggerCommand<DebugProcess<MockJdwpClient>> for SubmitAll {
    fn scope(&self) -> Option<&SuspensionScope> {
        Some(&self.scope)
    }

    fn run(self: Box<Self>, process: &mut DebugProcess<MockJdwpClient>) {
        let SubmitAll {
            scope,
            ids,
            results,
        } = *self;
        for id in ids {
            let context = process.evaluation_context(scope.clone(), None);
            let on_success = results.clone();
            let on_error = results.clone();
            process.submit(
                object(id),
                context,
                move |text: String| {
                    let _ = on_success.send((id.to_string(), Ok(text)));
                },
                move |message: String| {
                    let _ = on_error.send((id.to_string(), Err(message)));
                },
            );
        }
    }
}

#[test]
fn manager_thread_flushes_batches() {
    let (sender, queue) = ManagerQueue::new();
    let process = DebugProcess::new(
        debuggee_with_helper(),
        DebuggerConfig::default(),
        ConnectionKind::Local,
        &sender,
    );
    let thread = ManagerThread::spawn(queue, process).unwrap();
    let attachment = Attachment::new();
    let (tx, rx) = mpsc::channel();

    sender.invoke(SubmitAll {
        scope: attachment.suspend(Some(1)),
        ids: vec![5, 6, 7],
        results: tx,
    });
    let outcomes: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
        .collect();
    assert_eq!(
        outcomes,
        vec![ok("5", "obj#5"), ok("6", "obj#6"), ok("7", "obj#7")]
    );

    drop(sender);
    let process = thread.join().unwrap();
    assert_eq!(
        process
            .gateway()
            .count_calls(|call| matches!(call, nova_jdwp::MockCall::InvokeStatic { .. })),
        1
    );
}
