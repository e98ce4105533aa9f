//! Supervisor - owns the runtime's background tasks.
//!
//! Every task is spawned through [`Supervisor::spawn`], which catches both
//! `Err` results and panics, logs them with the task name and counts them.
//! A failing task never takes the process down. On shutdown the supervisor
//! flips a shared watch flag, gives cooperative tasks a grace period, then
//! aborts whatever is left.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::domain::foundation::DomainError;

pub struct Supervisor {
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
    failures: Arc<AtomicUsize>,
}

impl Supervisor {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            tasks: Mutex::new(Vec::new()),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<(String, JoinHandle<()>)>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Flag that turns true when shutdown starts. Long-running tasks should
    /// select on it.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Spawns a supervised task.
    pub fn spawn<F>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), DomainError>> + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        let failures = Arc::clone(&self.failures);

        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => tracing::debug!(task = %task_name, "Background task finished"),
                Ok(Err(e)) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(task = %task_name, error = %e, "Background task failed");
                }
                Err(panic) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        task = %task_name,
                        panic = %panic_message(panic.as_ref()),
                        "Background task panicked"
                    );
                }
            }
        });

        let mut tasks = self.tasks();
        tasks.retain(|(_, handle)| !handle.is_finished());
        tasks.push((name, handle));
    }

    /// Tasks that have not finished yet.
    pub fn running(&self) -> usize {
        self.tasks().iter().filter(|(_, h)| !h.is_finished()).count()
    }

    /// Tasks that returned an error or panicked.
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Signals shutdown and waits up to `grace` for tasks to stop; the rest
    /// are aborted.
    pub async fn shutdown(&self, grace: Duration) {
        self.shutdown.send_replace(true);
        let tasks: Vec<_> = self.tasks().drain(..).collect();
        let deadline = Instant::now() + grace;

        for (name, mut handle) in tasks {
            if time::timeout_at(deadline, &mut handle).await.is_err() {
                tracing::warn!(task = %name, "Background task did not stop in time, aborting");
                handle.abort();
            }
        }
        tracing::debug!("Supervisor stopped");
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        for (_, handle) in self.tasks().drain(..) {
            handle.abort();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;
    use std::sync::atomic::AtomicBool;

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn failed_and_panicking_tasks_are_counted() {
        let supervisor = Supervisor::new();

        supervisor.spawn("ok", async { Ok(()) });
        supervisor.spawn("fails", async {
            Err(DomainError::new(ErrorCode::InternalError, "boom"))
        });
        supervisor.spawn("panics", async {
            if true {
                panic!("task exploded");
            }
            Ok(())
        });
        settle().await;

        assert_eq!(supervisor.failure_count(), 2);
        assert_eq!(supervisor.running(), 0);
    }

    #[tokio::test]
    async fn cooperative_task_stops_on_signal() {
        let supervisor = Supervisor::new();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();
        let mut signal = supervisor.shutdown_signal();

        supervisor.spawn("worker", async move {
            while !*signal.borrow() {
                if signal.changed().await.is_err() {
                    break;
                }
            }
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });
        settle().await;
        assert_eq!(supervisor.running(), 1);

        supervisor.shutdown(Duration::from_secs(1)).await;

        assert!(stopped.load(Ordering::SeqCst));
        assert!(supervisor.is_shutting_down());
        assert_eq!(supervisor.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stubborn_task_is_aborted_after_grace() {
        let supervisor = Supervisor::new();
        supervisor.spawn("stubborn", async {
            std::future::pending::<()>().await;
            Ok(())
        });

        let started = Instant::now();
        supervisor.shutdown(Duration::from_secs(2)).await;

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(supervisor.running(), 0);
    }

    #[test]
    fn panic_message_handles_both_payload_kinds() {
        let static_str: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new("owned".to_string());
        assert_eq!(panic_message(static_str.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
    }
}
