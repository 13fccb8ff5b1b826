use nova_config::DebuggerConfig;
use nova_jdwp::{JdwpError, JdwpValue, ObjectId, RemoteCallGateway, TAG_ARRAY};
use thiserror::Error;

use crate::codec::{decode_response, latin1_bytes, DecodeError, ResponseEntry};
use crate::probe::BatchHelper;
use crate::request::{EvaluationContext, StringifyRequest};

/// Why a batch attempt was abandoned. Never surfaced to callers.
#[derive(Debug, Error)]
pub enum BatchFault {
    #[error("no suspended thread to run the batch helper on")]
    NoThread,
    #[error("batch array type is unavailable: {0}")]
    ArrayTypeUnavailable(#[source] JdwpError),
    #[error(transparent)]
    Remote(#[from] JdwpError),
    #[error("batch helper returned a non-string value")]
    NotAString,
    #[error("malformed batch response: {0}")]
    Decode(#[from] DecodeError),
    #[error("batch response has {actual} entries for {expected} requests")]
    EntryCountMismatch { expected: usize, actual: usize },
}

impl BatchFault {
    /// The reply (or an argument) was collected before it could be used.
    pub fn is_invalidated(&self) -> bool {
        matches!(self, Self::Remote(JdwpError::ObjectCollected(_)))
    }

    /// Whether this is one of the faults a batch attempt is expected to run
    /// into. Unexpected ones (the connection dropped, the request was
    /// cancelled) still fall back.
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Remote(err) | Self::ArrayTypeUnavailable(err) => err.is_batch_fault(),
            _ => true,
        }
    }
}

/// Stringify `requests` with one call to the debuggee helper.
///
/// Returns `true` when every request was completed from the reply; the vector
/// is then empty. Returns `false` without completing (or reordering) any
/// request when the attempt failed, leaving the caller to fall back.
pub fn evaluate_batch<G>(
    gateway: &mut G,
    helper: &BatchHelper,
    config: &DebuggerConfig,
    context: &EvaluationContext,
    requests: &mut Vec<StringifyRequest>,
) -> bool
where
    G: RemoteCallGateway + ?Sized,
{
    match try_evaluate_batch(gateway, helper, config, context, requests) {
        Ok(entries) => {
            for (request, entry) in requests.drain(..).zip(entries) {
                request.complete(entry);
            }
            true
        }
        Err(fault) => {
            tracing::debug!(
                target: "nova.batch_eval",
                scope = %context.scope().id(),
                requests = requests.len(),
                invalidated = fault.is_invalidated(),
                expected = fault.is_expected(),
                error = %fault,
                "batch evaluation failed; falling back to per-value evaluation"
            );
            false
        }
    }
}

fn try_evaluate_batch<G>(
    gateway: &mut G,
    helper: &BatchHelper,
    config: &DebuggerConfig,
    context: &EvaluationContext,
    requests: &[StringifyRequest],
) -> Result<Vec<ResponseEntry>, BatchFault>
where
    G: RemoteCallGateway + ?Sized,
{
    let thread = context.thread().ok_or(BatchFault::NoThread)?;
    let values: Vec<JdwpValue> = requests.iter().map(|r| r.value().clone()).collect();

    let array_type = gateway
        .find_class(thread, &config.batch_array_type, context.class_loader())
        .map_err(BatchFault::ArrayTypeUnavailable)?;
    let array = gateway.new_array(&array_type, values.len())?;
    gateway.set_array_values(array, &values)?;

    let result = gateway.invoke_static(
        thread,
        &helper.class,
        helper.method,
        &[JdwpValue::Object {
            tag: TAG_ARRAY,
            id: array,
        }],
    )?;
    let text = read_reply_text(gateway, &result)?;

    let entries = decode_response(&latin1_bytes(&text))?;
    if entries.len() != requests.len() {
        return Err(BatchFault::EntryCountMismatch {
            expected: requests.len(),
            actual: entries.len(),
        });
    }
    Ok(entries)
}

/// Read the helper's string reply, keeping it pinned while its text is fetched.
fn read_reply_text<G>(gateway: &mut G, result: &JdwpValue) -> Result<String, BatchFault>
where
    G: RemoteCallGateway + ?Sized,
{
    let Some(id) = result.object_id().filter(|_| result.is_string()) else {
        return Err(BatchFault::NotAString);
    };

    gateway.disable_collection(id)?;
    let text = gateway.string_value(id);
    release(gateway, id);
    Ok(text?)
}

fn release<G>(gateway: &mut G, id: ObjectId)
where
    G: RemoteCallGateway + ?Sized,
{
    if let Err(err) = gateway.enable_collection(id) {
        tracing::debug!(
            target: "nova.batch_eval",
            object = id,
            error = %err,
            "failed to re-enable collection of batch reply"
        );
    }
}
