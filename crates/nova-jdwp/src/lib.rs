//! Remote debuggee capability surface used by Nova's debugger.
//!
//! `nova-batch-eval` consumes this crate to locate classes and methods inside
//! the debuggee, build remote arrays and invoke remote methods. The traits are
//! synchronous: every caller runs on the debugger manager queue, which already
//! serializes access to a suspended VM.

#[cfg(any(test, feature = "test-support"))]
mod mock;

use thiserror::Error;

#[cfg(any(test, feature = "test-support"))]
pub use mock::{MockCall, MockJdwpClient, MockOp, MockReturn};

pub type ThreadId = u64;
pub type ObjectId = u64;
pub type ReferenceTypeId = u64;
pub type MethodId = u64;

/// JDWP tag for `java.lang.String` object values.
pub const TAG_STRING: u8 = b's';
/// JDWP tag for array object values.
pub const TAG_ARRAY: u8 = b'[';
/// JDWP tag for plain object values.
pub const TAG_OBJECT: u8 = b'L';

#[derive(Clone, Debug, PartialEq)]
pub enum JdwpValue {
    Null,
    Void,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(u16),
    Object { tag: u8, id: ObjectId },
}

impl JdwpValue {
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Self::Object { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::Object { tag: TAG_STRING, .. })
    }

    /// Render a value that does not need a round trip to the debuggee.
    ///
    /// Returns `None` for object references.
    pub fn local_display(&self) -> Option<String> {
        let text = match self {
            Self::Null => "null".to_string(),
            Self::Void => "void".to_string(),
            Self::Boolean(v) => v.to_string(),
            Self::Byte(v) => v.to_string(),
            Self::Short(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Long(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Double(v) => v.to_string(),
            Self::Char(c) => char::from_u32(u32::from(*c))
                .unwrap_or('\u{FFFD}')
                .to_string(),
            Self::Object { .. } => return None,
        };
        Some(text)
    }
}

/// A class resolved in the debuggee.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassHandle {
    pub id: ReferenceTypeId,
    pub name: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JdwpError {
    #[error("JDWP client is not connected")]
    NotConnected,
    #[error("class {0} is not loaded in the debuggee")]
    ClassNotLoaded(String),
    /// The remote object was garbage collected or otherwise invalidated.
    ///
    /// Expected whenever handles outlive the suspension they were created in.
    #[error("object {0} has been collected")]
    ObjectCollected(ObjectId),
    #[error("type mismatch: {0}")]
    InvalidType(String),
    #[error("method threw exception: {message}")]
    InvocationException { message: String },
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    #[error("JDWP command failed with error code {0}")]
    VmError(u16),
    #[error("JDWP request timed out")]
    Timeout,
    #[error("JDWP request cancelled")]
    Cancelled,
}

impl JdwpError {
    /// Faults that a best-effort batch attempt recovers from by falling back
    /// to per-value evaluation.
    pub fn is_batch_fault(&self) -> bool {
        matches!(
            self,
            Self::ClassNotLoaded(_)
                | Self::ObjectCollected(_)
                | Self::InvalidType(_)
                | Self::InvocationException { .. }
                | Self::Evaluation(_)
                | Self::VmError(_)
                | Self::Timeout
        )
    }
}

pub type Result<T, E = JdwpError> = std::result::Result<T, E>;

/// Class and method lookup in the debuggee.
pub trait RemoteClassResolver {
    /// Resolve `name` (binary name, or `java.lang.Object[]` style for arrays)
    /// through `class_loader`, loading it on `thread` if required.
    fn find_class(
        &mut self,
        thread: ThreadId,
        name: &str,
        class_loader: Option<ObjectId>,
    ) -> Result<ClassHandle>;

    fn find_method(
        &mut self,
        class: &ClassHandle,
        name: &str,
        signature: &str,
    ) -> Result<Option<MethodId>>;
}

/// Remote value construction and method invocation.
pub trait RemoteCallGateway: RemoteClassResolver {
    fn new_array(&mut self, array_type: &ClassHandle, length: usize) -> Result<ObjectId>;

    fn set_array_values(&mut self, array: ObjectId, values: &[JdwpValue]) -> Result<()>;

    /// `ClassType.InvokeMethod`: blocks until the debuggee returns or faults.
    fn invoke_static(
        &mut self,
        thread: ThreadId,
        class: &ClassHandle,
        method: MethodId,
        args: &[JdwpValue],
    ) -> Result<JdwpValue>;

    fn string_value(&mut self, string: ObjectId) -> Result<String>;

    fn disable_collection(&mut self, object: ObjectId) -> Result<()>;

    fn enable_collection(&mut self, object: ObjectId) -> Result<()>;

    /// Invoke `toString()` on a single object reference.
    fn invoke_to_string(&mut self, thread: ThreadId, object: ObjectId) -> Result<String>;
}
