use std::{
    any::Any,
    fmt, io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use tokio::sync::mpsc;

use crate::DebuggerCommand;

type BoxedCommand<S> = Box<dyn DebuggerCommand<S>>;

/// Cloneable handle used to enqueue commands onto a [`ManagerQueue`].
pub struct CommandSender<S> {
    tx: mpsc::UnboundedSender<BoxedCommand<S>>,
    enqueued: Arc<AtomicUsize>,
}

impl<S> Clone for CommandSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            enqueued: Arc::clone(&self.enqueued),
        }
    }
}

impl<S> fmt::Debug for CommandSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSender")
            .field("enqueued", &self.enqueued())
            .finish()
    }
}

impl<S> CommandSender<S> {
    /// Number of commands ever enqueued through this sender or its clones.
    pub fn enqueued(&self) -> usize {
        self.enqueued.load(Ordering::Relaxed)
    }
}

impl<S: 'static> CommandSender<S> {
    pub fn invoke<C>(&self, command: C)
    where
        C: DebuggerCommand<S> + 'static,
    {
        self.invoke_boxed(Box::new(command));
    }

    pub fn invoke_boxed(&self, command: BoxedCommand<S>) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(command).is_err() {
            // The queue is gone, and with it the session state the command
            // would need; nothing can run or observe it anymore.
            tracing::debug!(
                target: "nova.scheduler",
                "manager queue shut down; dropping command"
            );
        }
    }

    /// A handle that does not keep the queue open.
    pub fn downgrade(&self) -> WeakCommandSender<S> {
        WeakCommandSender {
            tx: self.tx.downgrade(),
            enqueued: Arc::clone(&self.enqueued),
        }
    }
}

/// Non-owning [`CommandSender`].
///
/// Session state that needs to enqueue follow-up commands holds one of these,
/// so the state itself never keeps its own manager queue alive.
pub struct WeakCommandSender<S> {
    tx: mpsc::WeakUnboundedSender<BoxedCommand<S>>,
    enqueued: Arc<AtomicUsize>,
}

impl<S> Clone for WeakCommandSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            enqueued: Arc::clone(&self.enqueued),
        }
    }
}

impl<S> fmt::Debug for WeakCommandSender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCommandSender").finish_non_exhaustive()
    }
}

impl<S> WeakCommandSender<S> {
    /// `None` once every strong sender is gone.
    pub fn upgrade(&self) -> Option<CommandSender<S>> {
        self.tx.upgrade().map(|tx| CommandSender {
            tx,
            enqueued: Arc::clone(&self.enqueued),
        })
    }
}

/// Single-writer executor for [`DebuggerCommand`]s.
///
/// Only one command runs at a time and it receives exclusive access to the
/// session state `S`.
pub struct ManagerQueue<S> {
    rx: mpsc::UnboundedReceiver<BoxedCommand<S>>,
}

impl<S: 'static> ManagerQueue<S> {
    pub fn new() -> (CommandSender<S>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = CommandSender {
            tx,
            enqueued: Arc::new(AtomicUsize::new(0)),
        };
        (sender, Self { rx })
    }

    /// Run queued commands until the queue is empty, including commands
    /// enqueued by the commands being run. Returns how many were processed.
    pub fn run_pending(&mut self, state: &mut S) -> usize {
        let mut processed = 0;
        while let Ok(command) = self.rx.try_recv() {
            execute(command, state);
            processed += 1;
        }
        processed
    }

    /// Whether a command is waiting.
    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }
}

fn execute<S>(command: BoxedCommand<S>, state: &mut S) {
    let cancelled = command.scope().is_some_and(|scope| !scope.is_valid());
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        if cancelled {
            command.cancelled(state);
        } else {
            command.run(state);
        }
    }));

    if let Err(panic) = outcome {
        tracing::error!(
            target: "nova.scheduler",
            cancelled,
            panic = %panic_message(&*panic),
            "debugger command panicked"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_else(|| "<non-string panic payload>".to_string())
}

/// A [`ManagerQueue`] driven by a dedicated worker thread.
///
/// The worker exits once every [`CommandSender`] has been dropped and the
/// queue is drained.
pub struct ManagerThread<S> {
    handle: JoinHandle<S>,
}

impl<S: Send + 'static> ManagerThread<S> {
    pub fn spawn(queue: ManagerQueue<S>, mut state: S) -> io::Result<Self> {
        let mut rx = queue.rx;
        let handle = std::thread::Builder::new()
            .name("nova-debugger-manager".to_string())
            .spawn(move || {
                while let Some(command) = rx.blocking_recv() {
                    execute(command, &mut state);
                }
                state
            })?;
        Ok(Self { handle })
    }

    /// Wait for the worker to drain and hand back the session state.
    pub fn join(self) -> io::Result<S> {
        self.handle
            .join()
            .map_err(|panic| io::Error::other(panic_message(&*panic)))
    }
}
