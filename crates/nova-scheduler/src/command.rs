use crate::SuspensionScope;

/// A unit of work for the manager queue.
///
/// `run` and `cancelled` both consume the command, so the queue can invoke
/// at most one of them.
pub trait DebuggerCommand<S>: Send {
    /// Scope the command is bound to. Unbound commands always run.
    fn scope(&self) -> Option<&SuspensionScope> {
        None
    }

    fn run(self: Box<Self>, state: &mut S);

    /// Called instead of `run` when the bound scope was torn down first.
    fn cancelled(self: Box<Self>, _state: &mut S) {}
}
