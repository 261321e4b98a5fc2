//! Ordered executor for outward notifications
//!
//! Every touch of the event sink and of a job's result sender happens inside
//! closures posted here, so callers observe notifications in posting order.

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the single notification context
#[derive(Clone)]
pub struct MainContext {
    tx: mpsc::UnboundedSender<Task>,
}

impl MainContext {
    /// Start the context on the current tokio runtime
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                task();
            }
        });
        Self { tx }
    }

    /// Queue `task` behind everything posted so far
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(task)).is_err() {
            warn!("Main context stopped; dropping notification");
        }
    }

    /// Wait until every task posted before this call has run
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        self.post(move || {
            let _ = done_tx.send(());
        });
        let _ = done_rx.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_tasks_run_in_posting_order() {
        let main = MainContext::spawn();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..50 {
            let seen = Arc::clone(&seen);
            main.post(move || seen.lock().unwrap().push(i));
        }
        main.flush().await;

        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }
}
