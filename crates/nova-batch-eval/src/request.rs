use std::fmt;

use nova_jdwp::{JdwpError, JdwpValue, ObjectId, RemoteCallGateway, ThreadId};
use nova_scheduler::SuspensionScope;

use crate::codec::ResponseEntry;

/// How the debugger is connected to the debuggee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionKind {
    /// A VM launched by, or running next to, the debugger.
    Local,
    /// A VM attached over the network.
    Remote,
}

/// Where a value is evaluated: the suspension it belongs to and the class
/// loader remote lookups go through.
#[derive(Clone, Debug)]
pub struct EvaluationContext {
    scope: SuspensionScope,
    class_loader: Option<ObjectId>,
    connection: ConnectionKind,
}

impl EvaluationContext {
    pub fn new(
        scope: SuspensionScope,
        class_loader: Option<ObjectId>,
        connection: ConnectionKind,
    ) -> Self {
        Self {
            scope,
            class_loader,
            connection,
        }
    }

    pub fn scope(&self) -> &SuspensionScope {
        &self.scope
    }

    pub fn thread(&self) -> Option<ThreadId> {
        self.scope.thread()
    }

    pub fn class_loader(&self) -> Option<ObjectId> {
        self.class_loader
    }

    pub fn is_remote(&self) -> bool {
        self.connection == ConnectionKind::Remote
    }
}

type Sink = Box<dyn FnOnce(String) + Send>;

/// "Produce a display string for this value."
///
/// Completing a request consumes it, so exactly one of its sinks can ever
/// fire. A request that is dropped without completing (its scope went away)
/// simply never reports.
pub struct StringifyRequest {
    value: JdwpValue,
    context: EvaluationContext,
    on_success: Sink,
    on_error: Sink,
}

impl StringifyRequest {
    pub fn new<S, E>(value: JdwpValue, context: EvaluationContext, on_success: S, on_error: E) -> Self
    where
        S: FnOnce(String) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        Self {
            value,
            context,
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    pub fn value(&self) -> &JdwpValue {
        &self.value
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    pub fn scope(&self) -> &SuspensionScope {
        self.context.scope()
    }

    pub fn succeed(self, text: String) {
        (self.on_success)(text);
    }

    pub fn fail(self, message: String) {
        (self.on_error)(message);
    }

    pub(crate) fn complete(self, entry: ResponseEntry) {
        if entry.is_error {
            self.fail(method_exception_message(&entry.message));
        } else {
            self.succeed(entry.message);
        }
    }

    /// Stringify this value on its own with a `toString()` round trip.
    ///
    /// Safe to call after a failed batch attempt: the batch path never
    /// completes a request it hands back.
    pub fn evaluate_individually<G>(self, gateway: &mut G)
    where
        G: RemoteCallGateway + ?Sized,
    {
        match individual_value_string(gateway, &self.value, self.context.thread()) {
            Ok(text) => self.succeed(text),
            Err(err) => {
                let message = user_message(&err);
                self.fail(message);
            }
        }
    }
}

impl fmt::Debug for StringifyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringifyRequest")
            .field("value", &self.value)
            .field("scope", &self.context.scope().id())
            .finish_non_exhaustive()
    }
}

fn individual_value_string<G>(
    gateway: &mut G,
    value: &JdwpValue,
    thread: Option<ThreadId>,
) -> Result<String, JdwpError>
where
    G: RemoteCallGateway + ?Sized,
{
    if let Some(text) = value.local_display() {
        return Ok(text);
    }
    let Some(object) = value.object_id() else {
        return Err(JdwpError::InvalidType(format!("cannot stringify {value:?}")));
    };
    let thread = thread.ok_or_else(|| {
        JdwpError::Evaluation("no suspended thread to evaluate on".to_string())
    })?;
    gateway.invoke_to_string(thread, object)
}

/// Text shown for a value whose `toString()` threw inside the debuggee.
pub fn method_exception_message(exception: &str) -> String {
    format!("Method threw '{exception}' exception.")
}

fn user_message(err: &JdwpError) -> String {
    match err {
        JdwpError::InvocationException { message } => method_exception_message(message),
        other => other.to_string(),
    }
}
