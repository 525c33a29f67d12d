//! # Main Context
//!
//! Consumers (typically a UI) want every completion delivered on one serial
//! context so they can touch their own state without locking. The DAO layers
//! are plain `async fn`s and complete wherever the runtime polls them;
//! [`MainContext::resume`] is the one place where a result is handed back to
//! the designated context.
//!
//! ```text
//! caller ──resume(future, completion)──> tokio runtime (future runs here)
//!                                             │
//!                                             └─post(completion(output))──> main thread
//! ```
//!
//! The main context is a dedicated thread draining a job queue in FIFO order.
//! [`MainContext::is_current`] tells whether the calling thread is that thread.

use crate::error::{CloudError, Result};
use parking_lot::Mutex;
use std::cell::Cell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_CONTEXT: Cell<Option<u64>> = const { Cell::new(None) };
}

struct Inner {
    id: u64,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Closing the queue lets the thread finish the remaining jobs and exit.
        self.sender.lock().take();
    }
}

/// Handle to a designated serial execution context. Cheap to clone.
#[derive(Clone)]
pub struct MainContext {
    inner: Arc<Inner>,
}

impl MainContext {
    /// Spawn the main thread. Futures passed to [`resume`](Self::resume) run
    /// on `runtime`.
    pub fn start(runtime: Handle) -> Result<Self> {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let thread = thread::Builder::new()
            .name(format!("cloudmap-main-{}", id))
            .spawn(move || {
                CURRENT_CONTEXT.with(|current| current.set(Some(id)));
                while let Some(job) = receiver.blocking_recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!(context = id, "completion panicked on the main context");
                    }
                }
                debug!(context = id, "main context stopped");
            })?;

        Ok(Self {
            inner: Arc::new(Inner {
                id,
                sender: Mutex::new(Some(sender)),
                thread: Mutex::new(Some(thread)),
                runtime,
            }),
        })
    }

    /// Start on the runtime the caller is running in.
    pub fn start_current() -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|err| CloudError::Config(format!("no tokio runtime: {}", err)))?;
        Self::start(runtime)
    }

    /// True when called from this context's thread.
    pub fn is_current(&self) -> bool {
        CURRENT_CONTEXT.with(|current| current.get() == Some(self.inner.id))
    }

    pub fn runtime(&self) -> &Handle {
        &self.inner.runtime
    }

    /// Queue `job` to run on the main thread.
    pub fn post<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.inner.sender.lock();
        let sender = sender.as_ref().ok_or(CloudError::MainContextClosed)?;
        sender
            .send(Box::new(job))
            .map_err(|_| CloudError::MainContextClosed)
    }

    /// Run `future` on the runtime and deliver its output to `completion` on
    /// the main thread. Returns immediately.
    pub fn resume<F, C>(&self, future: F, completion: C)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
        C: FnOnce(F::Output) + Send + 'static,
    {
        let main = self.clone();
        self.inner.runtime.spawn(async move {
            let output = future.await;
            if main.post(move || completion(output)).is_err() {
                warn!(context = main.inner.id, "main context closed, dropping completion");
            }
        });
    }

    /// Stop accepting jobs and wait for queued ones to finish.
    ///
    /// Calling this from the main thread itself only closes the queue.
    pub fn shutdown(&self) {
        self.inner.sender.lock().take();
        if self.is_current() {
            return;
        }
        let thread = self.inner.thread.lock().take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                error!(context = self.inner.id, "main context thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_resume_delivers_on_main_thread() {
        let main = MainContext::start_current().unwrap();
        assert!(!main.is_current());

        let (tx, rx) = std_mpsc::channel();
        let check = main.clone();
        main.resume(async { 21 * 2 }, move |value| {
            tx.send((value, check.is_current())).unwrap();
        });

        let (value, on_main) =
            tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(5)))
                .await
                .unwrap()
                .unwrap();
        assert_eq!(value, 42);
        assert!(on_main);
        main.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_posted_jobs_run_in_order() {
        let main = MainContext::start_current().unwrap();
        let (tx, rx) = std_mpsc::channel();
        for n in 0..5 {
            let tx = tx.clone();
            main.post(move || tx.send(n).unwrap()).unwrap();
        }
        drop(tx);

        let seen: Vec<i32> = tokio::task::spawn_blocking(move || rx.iter().collect())
            .await
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        main.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_post_after_shutdown_fails() {
        let main = MainContext::start_current().unwrap();
        main.shutdown();
        assert!(matches!(
            main.post(|| {}),
            Err(CloudError::MainContextClosed)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_completion_does_not_stop_the_context() {
        let main = MainContext::start_current().unwrap();
        main.post(|| panic!("boom")).unwrap();

        let (tx, rx) = std_mpsc::channel();
        main.post(move || tx.send(()).unwrap()).unwrap();
        let delivered = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(delivered.is_ok());
        main.shutdown();
    }
}
