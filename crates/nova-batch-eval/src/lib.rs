//! Batched `toString()` evaluation for paused Java debuggees.
//!
//! Rendering a variables view asks for many display strings at once. Each
//! one is a `toString()` invocation inside the debuggee, and each invocation
//! is a full JDWP round trip. When the debuggee carries the batch helper
//! class, every request made during one suspension is collected and sent as a
//! single `Object[]` to the helper, which answers with one length-prefixed
//! string (see [`codec`]).
//!
//! Requests are submitted through [`DebugProcess`], the session state owned
//! by the manager queue. The first request for a suspension scope schedules a
//! flush command; later ones join its batch. If batching is unavailable or
//! the batch attempt fails for any reason, every request is evaluated on its
//! own instead, in submission order.

pub mod codec;
mod coordinator;
mod evaluator;
mod probe;
mod process;
mod request;

pub use codec::{decode_response, encode_response, DecodeError, ResponseEntry};
pub use coordinator::BatchEvaluator;
pub use evaluator::{evaluate_batch, BatchFault};
pub use probe::{AvailabilityProbe, BatchAvailability, BatchHelper};
pub use process::DebugProcess;
pub use request::{method_exception_message, ConnectionKind, EvaluationContext, StringifyRequest};
