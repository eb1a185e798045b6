//! A thin wrapper around a [`tokio::runtime::Handle`] that tags every spawned task with a name
//! (for panic messages) and ties it to a shared shutdown signal, so that `main()` doesn't need to
//! keep a `Vec<JoinHandle<_>>` by hand.

use futures::future::Future;
use slog::{crit, debug, Logger};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared by every [`TaskExecutor`] clone; flips to `true` exactly once, on shutdown.
pub type ShutdownReceiver = watch::Receiver<bool>;
pub type ShutdownSender = watch::Sender<bool>;

pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

#[derive(Clone)]
pub struct TaskExecutor {
    handle: Handle,
    exit: ShutdownReceiver,
    log: Logger,
}

impl TaskExecutor {
    pub fn new(handle: Handle, exit: ShutdownReceiver, log: Logger) -> Self {
        Self { handle, exit, log }
    }

    /// A receiver that resolves once shutdown has been requested; cheap to clone and `await` in
    /// a `select!` branch.
    pub fn exit(&self) -> ShutdownReceiver {
        self.exit.clone()
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawn a task, logging (rather than panicking the whole process) if it returns an `Err`
    /// after the caller has already wrapped it in a `Result`-returning future.
    pub fn spawn(&self, task: impl Future<Output = ()> + Send + 'static, name: &'static str) {
        let log = self.log.clone();
        debug!(log, "Spawning task"; "name" => name);
        self.handle.spawn(async move {
            task.await;
            debug!(log, "Task exited"; "name" => name);
        });
    }

    pub fn spawn_handle<R: Send + 'static>(
        &self,
        task: impl Future<Output = R> + Send + 'static,
        name: &'static str,
    ) -> JoinHandle<R> {
        let log = self.log.clone();
        debug!(log, "Spawning task"; "name" => name);
        self.handle.spawn(task)
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }
}

/// Request shutdown of every task holding a clone of the paired [`ShutdownReceiver`].
pub fn request_shutdown(sender: &ShutdownSender, log: &Logger) {
    if sender.send(true).is_err() {
        crit!(log, "Failed to broadcast shutdown signal; no listeners remain");
    }
}
