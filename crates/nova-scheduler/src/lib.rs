//! Nova's debugger manager queue.
//!
//! Every command that touches a suspended debuggee runs on one logical,
//! single-writer queue per debug session. Commands are bound to the
//! [`SuspensionScope`] they were created for; if the scope is torn down
//! before the command gets to run, the command is cancelled instead.

mod command;
mod queue;
mod scope;

pub use command::DebuggerCommand;
pub use queue::{CommandSender, ManagerQueue, ManagerThread, WeakCommandSender};
pub use scope::{Attachment, SuspendScopeId, SuspensionScope};
pub use tokio_util::sync::CancellationToken;
