use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A bounded worker pool: jobs are enqueued with [`Dispatcher::add`] and run
/// concurrently, with at most `max_workers` running at once.
///
/// Each job holds a `Semaphore` permit for its lifetime rather than sharing
/// a mutable running-count, so there's nothing to lock. A job that panics is
/// caught by the underlying `JoinSet` and logged rather than propagated to
/// [`Dispatcher::wait`]'s caller.
pub struct Dispatcher<T> {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<T>,
}

impl<T> Dispatcher<T>
where
    T: Send + 'static,
{
    /// Creates a dispatcher allowing up to `max_workers` jobs to run at once.
    pub fn new(max_workers: usize) -> Self {
        Dispatcher {
            semaphore: Arc::new(Semaphore::new(max_workers.max(1))),
            tasks: JoinSet::new(),
        }
    }

    /// Enqueues a job. The job starts running as soon as a worker slot is
    /// free; `add` itself never blocks.
    pub fn add<F>(&mut self, job: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        self.tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("dispatcher semaphore is never closed");
            job.await
        });
    }

    /// Waits for every dispatched job to finish and returns their results.
    /// A job that panicked is logged and omitted from the result list,
    /// mirroring the original's "a dispatcher thread crashed" handling.
    pub async fn wait(mut self) -> Vec<T> {
        let mut results = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(value) => results.push(value),
                Err(err) => log::warn!("a dispatcher job panicked: {err}"),
            }
        }
        results
    }

    /// Aborts every job that hasn't completed yet, for a caller that has
    /// decided the outer operation is done early.
    pub fn quit(mut self) {
        self.tasks.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_every_job_and_collects_results() {
        let mut dispatcher = Dispatcher::new(2);
        for i in 0..5 {
            dispatcher.add(async move { i * 2 });
        }
        let mut results = dispatcher.wait().await;
        results.sort_unstable();
        assert_eq!(results, vec![0, 2, 4, 6, 8]);
    }

    #[tokio::test]
    async fn bounds_concurrency_to_max_workers() {
        let concurrent = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = Dispatcher::new(2);
        for _ in 0..8 {
            let concurrent = concurrent.clone();
            let max_seen = max_seen.clone();
            dispatcher.add(async move {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
            });
        }
        dispatcher.wait().await;
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn quit_aborts_unfinished_jobs_without_hanging() {
        let mut dispatcher: Dispatcher<()> = Dispatcher::new(1);
        dispatcher.add(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        dispatcher.add(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });
        dispatcher.quit();
    }
}
