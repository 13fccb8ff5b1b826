use nova_config::DebuggerConfig;
use nova_jdwp::{ClassHandle, MethodId, ObjectId, RemoteClassResolver, ThreadId};

use crate::request::EvaluationContext;

/// Whether the batch helper exists in the attached debuggee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BatchAvailability {
    #[default]
    Unknown,
    Available,
    Unavailable,
}

/// The resolved helper entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchHelper {
    pub class: ClassHandle,
    pub method: MethodId,
}

#[derive(Debug, Default)]
enum ProbeState {
    #[default]
    Unknown,
    Available(BatchHelper),
    Unavailable,
}

/// Per-attachment cache of the batch helper lookup.
///
/// The remote lookup runs at most once per attachment; [`Self::on_detach`]
/// re-arms it for the next attachment.
#[derive(Debug, Default)]
pub struct AvailabilityProbe {
    state: ProbeState,
}

impl AvailabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn availability(&self) -> BatchAvailability {
        match self.state {
            ProbeState::Unknown => BatchAvailability::Unknown,
            ProbeState::Available(_) => BatchAvailability::Available,
            ProbeState::Unavailable => BatchAvailability::Unavailable,
        }
    }

    pub fn helper(&self) -> Option<&BatchHelper> {
        match &self.state {
            ProbeState::Available(helper) => Some(helper),
            _ => None,
        }
    }

    pub fn is_batching_available<R>(
        &mut self,
        resolver: &mut R,
        context: &EvaluationContext,
        config: &DebuggerConfig,
    ) -> bool
    where
        R: RemoteClassResolver + ?Sized,
    {
        match self.state {
            ProbeState::Available(_) => return true,
            ProbeState::Unavailable => return false,
            ProbeState::Unknown => {}
        }

        if context.is_remote() {
            // The helper is never deployed to VMs attached over the network.
            self.state = ProbeState::Unavailable;
            tracing::debug!(
                target: "nova.batch_eval",
                "remote debuggee; batch evaluation disabled"
            );
            return false;
        }

        // Without a suspended thread nothing can be loaded; try again later.
        let Some(thread) = context.thread() else {
            return false;
        };

        self.state = match lookup_helper(resolver, thread, context.class_loader(), config) {
            Some(helper) => ProbeState::Available(helper),
            None => ProbeState::Unavailable,
        };
        tracing::debug!(
            target: "nova.batch_eval",
            class = %config.batch_helper_class,
            availability = ?self.availability(),
            "probed batch helper"
        );
        matches!(self.state, ProbeState::Available(_))
    }

    pub fn on_detach(&mut self) {
        self.state = ProbeState::Unknown;
    }
}

fn lookup_helper<R>(
    resolver: &mut R,
    thread: ThreadId,
    class_loader: Option<ObjectId>,
    config: &DebuggerConfig,
) -> Option<BatchHelper>
where
    R: RemoteClassResolver + ?Sized,
{
    let class = match resolver.find_class(thread, &config.batch_helper_class, class_loader) {
        Ok(class) => class,
        Err(err) => {
            tracing::debug!(
                target: "nova.batch_eval",
                error = %err,
                "batch helper class not found"
            );
            return None;
        }
    };

    match resolver.find_method(
        &class,
        &config.batch_helper_method,
        &config.batch_helper_signature,
    ) {
        Ok(Some(method)) => Some(BatchHelper { class, method }),
        Ok(None) => None,
        Err(err) => {
            tracing::debug!(
                target: "nova.batch_eval",
                error = %err,
                "batch helper method lookup failed"
            );
            None
        }
    }
}
