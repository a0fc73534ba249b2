//! Execution contexts
//!
//! An [`ExecutionContext`] decides where a `Deferred` body (and everything
//! after a `ContinueOn`) runs. The run-loop only ever submits tasks; pools
//! and their lifecycles belong to the caller.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Unit of work submitted to an execution context
pub type Task = Box<dyn FnOnce() + Send>;

/// Something that can run tasks, now or later, on some thread
pub trait ExecutionContext: Send + Sync {
    /// Submit a task. It must run exactly once: a context that cannot hand
    /// the task off runs it inline instead of dropping it.
    fn execute(&self, task: Task);

    /// Name used in logs
    fn name(&self) -> &str;
}

impl fmt::Debug for dyn ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExecutionContext({})", self.name())
    }
}

/* ===================== Immediate ===================== */

/// Runs tasks inline on the submitting thread
///
/// Resumptions through this context nest on the caller's stack, one level
/// per suspension.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl ExecutionContext for Immediate {
    fn execute(&self, task: Task) {
        task();
    }

    fn name(&self) -> &str {
        "immediate"
    }
}

/* ===================== New Thread ===================== */

/// Runs every task on a freshly spawned OS thread
///
/// If the thread cannot be spawned the task runs inline on the submitting
/// thread.
#[derive(Debug, Clone)]
pub struct NewThread {
    name: String,
    stack_size: Option<usize>,
}

impl NewThread {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack_size: None,
        }
    }

    /// Stack size in bytes for spawned threads
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Default for NewThread {
    fn default() -> Self {
        Self::named("runloop-thread")
    }
}

impl ExecutionContext for NewThread {
    fn execute(&self, task: Task) {
        let slot = Arc::new(Mutex::new(Some(task)));
        let claimed = Arc::clone(&slot);

        let mut builder = std::thread::Builder::new().name(self.name.clone());
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        let spawned = builder.spawn(move || {
            let task = claimed.lock().take();
            if let Some(task) = task {
                task();
            }
        });

        if let Err(e) = spawned {
            tracing::warn!(context = %self.name, error = %e, "failed to spawn thread, running task inline");
            let task = slot.lock().take();
            if let Some(task) = task {
                task();
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/* ===================== Tokio ===================== */

/// Runs tasks on a tokio runtime's blocking pool
///
/// Tasks are plain closures that may block, so they go through
/// `spawn_blocking` rather than onto the async workers.
#[derive(Debug, Clone)]
pub struct TokioContext {
    handle: tokio::runtime::Handle,
}

impl TokioContext {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Context for the runtime the caller is running inside
    ///
    /// Panics when called outside a tokio runtime, like `Handle::current`.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl ExecutionContext for TokioContext {
    fn execute(&self, task: Task) {
        drop(self.handle.spawn_blocking(task));
    }

    fn name(&self) -> &str {
        "tokio"
    }
}

/// Shorthand for sharing a context between nodes
pub fn shared<C: ExecutionContext + 'static>(context: C) -> Arc<dyn ExecutionContext> {
    Arc::new(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_immediate_runs_inline() {
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        Immediate.execute(Box::new(move || {
            tx.send(std::thread::current().id()).unwrap();
        }));
        assert_eq!(rx.try_recv().unwrap(), caller);
    }

    #[test]
    fn test_new_thread_uses_named_thread() {
        let (tx, rx) = mpsc::channel();
        NewThread::named("ctx-test").execute(Box::new(move || {
            tx.send(std::thread::current().name().map(str::to_string))
                .unwrap();
        }));
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("ctx-test"));
    }

    #[cfg(all(target_os = "linux", target_pointer_width = "64"))]
    #[test]
    fn test_new_thread_runs_inline_when_spawn_fails() {
        let caller = std::thread::current().id();
        let (tx, rx) = mpsc::channel();
        // No address space can hold this stack, so the spawn is refused
        NewThread::named("ctx-huge")
            .with_stack_size(1 << 60)
            .execute(Box::new(move || {
                tx.send(std::thread::current().id()).unwrap();
            }));
        assert_eq!(rx.try_recv().unwrap(), caller);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tokio_context_runs_task() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        TokioContext::current().execute(Box::new(move || {
            let _ = tx.send(42);
        }));
        assert_eq!(rx.await.unwrap(), 42);
    }
}
