//! Running CPU-heavy work from inside the inbound task.

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::block_in_place;

/// Runs `work` on the current thread, first telling a multi-threaded tokio
/// runtime to move its other tasks off this worker.
///
/// On a current-thread runtime, or outside any runtime, `work` simply runs
/// inline.
pub fn run_blocking<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => block_in_place(work),
        _ => work(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_outside_runtime() {
        assert_eq!(run_blocking(|| 7), 7);
    }

    #[tokio::test]
    async fn test_runs_on_current_thread_runtime() {
        assert_eq!(run_blocking(|| "inline"), "inline");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_other_tasks_progress_while_blocked() {
        let (tx, rx) = std::sync::mpsc::channel();
        let ticker = tokio::spawn(async move {
            tx.send(()).unwrap();
        });

        let received = run_blocking(|| rx.recv_timeout(std::time::Duration::from_secs(5)));
        assert!(received.is_ok());
        ticker.await.unwrap();
    }
}
