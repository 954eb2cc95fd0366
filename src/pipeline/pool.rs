use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::warn;

/// Runs `task(0..len)` on a run-local rayon pool of `workers` threads and
/// returns the results in index order. `workers <= 1` stays on the calling
/// thread.
pub(crate) fn run_indexed<T, F>(len: usize, workers: usize, task: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    if workers <= 1 || len <= 1 {
        return (0..len).map(task).collect();
    }

    match ThreadPoolBuilder::new().num_threads(workers.min(len)).build() {
        Ok(pool) => pool.install(|| (0..len).into_par_iter().map(task).collect()),
        Err(err) => {
            warn!(workers, error = %err, "cannot start worker pool, running sequentially");
            (0..len).map(task).collect()
        }
    }
}
