use nova_config::{DebuggerConfig, NovaConfig};
use nova_jdwp::{JdwpValue, ObjectId, RemoteCallGateway};
use nova_scheduler::{CommandSender, SuspensionScope, WeakCommandSender};

use crate::coordinator::BatchEvaluator;
use crate::request::{ConnectionKind, EvaluationContext, StringifyRequest};

/// Session state owned by the debugger manager queue.
///
/// Commands receive `&mut DebugProcess` while they run, which is the only way
/// anything reaches the gateway or the batch state.
pub struct DebugProcess<G> {
    gateway: G,
    config: DebuggerConfig,
    connection: ConnectionKind,
    batch: BatchEvaluator,
    commands: WeakCommandSender<DebugProcess<G>>,
}

impl<G> DebugProcess<G>
where
    G: RemoteCallGateway + Send + 'static,
{
    pub fn new(
        gateway: G,
        config: DebuggerConfig,
        connection: ConnectionKind,
        commands: &CommandSender<DebugProcess<G>>,
    ) -> Self {
        Self {
            gateway,
            config,
            connection,
            batch: BatchEvaluator::new(),
            commands: commands.downgrade(),
        }
    }

    /// Start a session from a loaded configuration file. Installs the global
    /// tracing subscriber described by `[logging]` on first use.
    pub fn from_config(
        gateway: G,
        config: &NovaConfig,
        connection: ConnectionKind,
        commands: &CommandSender<DebugProcess<G>>,
    ) -> Self {
        nova_config::init_tracing(&config.logging);
        Self::new(gateway, config.debugger.clone(), connection, commands)
    }

    pub fn evaluation_context(
        &self,
        scope: SuspensionScope,
        class_loader: Option<ObjectId>,
    ) -> EvaluationContext {
        EvaluationContext::new(scope, class_loader, self.connection)
    }

    /// Ask for `value`'s display string. Exactly one of the sinks fires later
    /// from the manager queue, or neither does if `context`'s scope is torn
    /// down first.
    pub fn submit<S, E>(
        &mut self,
        value: JdwpValue,
        context: EvaluationContext,
        on_success: S,
        on_error: E,
    ) where
        S: FnOnce(String) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        self.submit_request(StringifyRequest::new(value, context, on_success, on_error));
    }

    pub fn submit_request(&mut self, request: StringifyRequest) {
        let Some(commands) = self.commands.upgrade() else {
            tracing::debug!(
                target: "nova.batch_eval",
                "manager queue shut down; dropping stringify request"
            );
            return;
        };
        self.batch
            .submit(request, &mut self.gateway, &self.config, &commands);
    }

    pub fn is_batching_available(&mut self, context: &EvaluationContext) -> bool {
        self.batch
            .is_batching_available(&mut self.gateway, context, &self.config)
    }

    /// The debuggee went away. Scopes are invalidated by the attachment; this
    /// only forgets what was learned about the old VM.
    pub fn process_detached(&mut self) {
        tracing::debug!(target: "nova.batch_eval", "debuggee detached");
        self.batch.on_detach();
    }

    pub(crate) fn flush_batch(&mut self, context: &EvaluationContext) {
        self.batch.flush(&mut self.gateway, &self.config, context);
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    pub fn batch_evaluator(&self) -> &BatchEvaluator {
        &self.batch
    }

    pub(crate) fn batch_evaluator_mut(&mut self) -> &mut BatchEvaluator {
        &mut self.batch
    }

    /// Sender for this session's manager queue, while the queue is open.
    pub fn commands(&self) -> Option<CommandSender<DebugProcess<G>>> {
        self.commands.upgrade()
    }
}
