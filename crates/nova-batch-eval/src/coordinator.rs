use std::collections::{hash_map::Entry, HashMap};

use nova_config::DebuggerConfig;
use nova_jdwp::RemoteCallGateway;
use nova_scheduler::{CommandSender, DebuggerCommand, SuspendScopeId, SuspensionScope};

use crate::evaluator::evaluate_batch;
use crate::probe::{AvailabilityProbe, BatchAvailability};
use crate::process::DebugProcess;
use crate::request::{EvaluationContext, StringifyRequest};

/// Collects stringify requests per suspension scope and flushes each scope's
/// batch with a single remote call.
///
/// All state is owned by the session and only touched from commands running
/// on the manager queue, so it needs no locking.
#[derive(Debug, Default)]
pub struct BatchEvaluator {
    probe: AvailabilityProbe,
    pending: HashMap<SuspendScopeId, Vec<StringifyRequest>>,
}

impl BatchEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn availability(&self) -> BatchAvailability {
        self.probe.availability()
    }

    /// False when batching is switched off in `config`; the debuggee is not
    /// probed in that case.
    pub fn is_batching_available<G>(
        &mut self,
        gateway: &mut G,
        context: &EvaluationContext,
        config: &DebuggerConfig,
    ) -> bool
    where
        G: RemoteCallGateway + ?Sized,
    {
        config.batch_evaluation && self.probe.is_batching_available(gateway, context, config)
    }

    /// Queue `request` for stringification.
    ///
    /// The first request for a scope schedules that scope's flush command;
    /// later requests for the same scope join the pending batch.
    pub fn submit<G>(
        &mut self,
        request: StringifyRequest,
        gateway: &mut G,
        config: &DebuggerConfig,
        commands: &CommandSender<DebugProcess<G>>,
    ) where
        G: RemoteCallGateway + Send + 'static,
    {
        // Primitives and null render locally and never cost a round trip.
        let local = request.value().object_id().is_none();
        if local || !self.is_batching_available(gateway, request.context(), config) {
            commands.invoke(IndividualCommand { request });
            return;
        }

        match self.pending.entry(request.scope().id()) {
            Entry::Occupied(mut batch) => batch.get_mut().push(request),
            Entry::Vacant(slot) => {
                let flush = FlushCommand {
                    context: request.context().clone(),
                };
                slot.insert(vec![request]);
                commands.invoke(flush);
            }
        }
    }

    /// Number of requests waiting for `scope`'s flush.
    pub fn pending_len(&self, scope: SuspendScopeId) -> usize {
        self.pending.get(&scope).map_or(0, Vec::len)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn on_detach(&mut self) {
        self.probe.on_detach();
    }

    fn take_pending(&mut self, scope: SuspendScopeId) -> Vec<StringifyRequest> {
        self.pending.remove(&scope).unwrap_or_default()
    }

    pub(crate) fn flush<G>(
        &mut self,
        gateway: &mut G,
        config: &DebuggerConfig,
        context: &EvaluationContext,
    ) where
        G: RemoteCallGateway + ?Sized,
    {
        let mut requests = self.take_pending(context.scope().id());
        if requests.is_empty() {
            return;
        }

        let evaluated = match self.probe.helper() {
            Some(helper) => evaluate_batch(gateway, helper, config, context, &mut requests),
            None => false,
        };
        if !evaluated {
            for request in requests {
                request.evaluate_individually(gateway);
            }
        }
    }

    pub(crate) fn discard(&mut self, scope: SuspendScopeId) {
        let dropped = self.take_pending(scope);
        tracing::debug!(
            target: "nova.batch_eval",
            scope = %scope,
            requests = dropped.len(),
            "scope torn down before flush; dropping pending batch"
        );
    }
}

/// Flushes one scope's pending batch.
struct FlushCommand {
    context: EvaluationContext,
}

impl<G> DebuggerCommand<DebugProcess<G>> for FlushCommand
where
    G: RemoteCallGateway + Send + 'static,
{
    fn scope(&self) -> Option<&SuspensionScope> {
        Some(self.context.scope())
    }

    fn run(self: Box<Self>, process: &mut DebugProcess<G>) {
        process.flush_batch(&self.context);
    }

    fn cancelled(self: Box<Self>, process: &mut DebugProcess<G>) {
        process.batch_evaluator_mut().discard(self.context.scope().id());
    }
}

/// Stringifies a single value with its own `toString()` call.
struct IndividualCommand {
    request: StringifyRequest,
}

impl<G> DebuggerCommand<DebugProcess<G>> for IndividualCommand
where
    G: RemoteCallGateway + Send + 'static,
{
    fn scope(&self) -> Option<&SuspensionScope> {
        Some(self.request.scope())
    }

    fn run(self: Box<Self>, process: &mut DebugProcess<G>) {
        self.request.evaluate_individually(process.gateway_mut());
    }
}
