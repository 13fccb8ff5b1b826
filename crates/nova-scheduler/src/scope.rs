use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::atomic::{AtomicU64, Ordering},
};

use nova_jdwp::ThreadId;
use tokio_util::sync::CancellationToken;

/// Scope ids are unique across attachments; batch state keyed by scope
/// survives a detach.
static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// Identity of one coherent pause of the debuggee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuspendScopeId(u64);

impl fmt::Display for SuspendScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "suspend#{}", self.0)
    }
}

/// One debuggee attachment.
///
/// Scopes handed out by [`Attachment::suspend`] share the attachment's
/// cancellation token as parent, so detaching invalidates all of them.
#[derive(Debug)]
pub struct Attachment {
    token: CancellationToken,
}

impl Attachment {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Open a new suspension scope, e.g. for a breakpoint hit on `thread`.
    pub fn suspend(&self, thread: Option<ThreadId>) -> SuspensionScope {
        let id = SuspendScopeId(NEXT_SCOPE.fetch_add(1, Ordering::Relaxed));
        SuspensionScope {
            id,
            thread,
            token: self.token.child_token(),
        }
    }

    pub fn detach(&self) {
        self.token.cancel();
    }

    pub fn is_detached(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Default for Attachment {
    fn default() -> Self {
        Self::new()
    }
}

/// A window during which remote value handles stay valid.
///
/// Cloning is cheap; clones observe the same invalidation.
#[derive(Clone, Debug)]
pub struct SuspensionScope {
    id: SuspendScopeId,
    thread: Option<ThreadId>,
    token: CancellationToken,
}

impl SuspensionScope {
    pub fn id(&self) -> SuspendScopeId {
        self.id
    }

    /// The suspended thread remote invocations run on, if any.
    pub fn thread(&self) -> Option<ThreadId> {
        self.thread
    }

    /// Mark the scope as over (the debuggee resumed).
    pub fn invalidate(&self) {
        self.token.cancel();
    }

    pub fn is_valid(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl PartialEq for SuspensionScope {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SuspensionScope {}

impl Hash for SuspensionScope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
