use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, bounded};

/// Producer-consumer pool over crossbeam scoped threads.
///
/// Every work item is tagged with its position on the way in, and results are
/// sorted back into that order before they are returned.
pub struct ParallelExecutor {
    max_workers: usize,
    buffer_size: usize,
}

/// Context for worker threads to avoid too many function parameters
struct WorkerContext<'a, T, R, F> {
    worker_id: usize,
    work_rx: Receiver<(usize, T)>,
    result_tx: Sender<(usize, R)>,
    processor: &'a F,
}

impl ParallelExecutor {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            max_workers,
            buffer_size: max_workers * 2,
        }
    }

    pub fn execute<T, R, F>(&self, work_items: Vec<T>, processor: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        if work_items.is_empty() {
            return Ok(Vec::new());
        }

        let total_items = work_items.len();
        let actual_workers = std::cmp::min(self.max_workers, total_items);
        let (work_tx, work_rx) = bounded::<(usize, T)>(self.buffer_size);
        let (result_tx, result_rx) = bounded::<(usize, R)>(self.buffer_size);
        let processor = &processor;

        tracing::debug!(workers = actual_workers, items = total_items, "starting parallel execution");

        let mut indexed = crossbeam::thread::scope(|s| {
            for worker_id in 0..actual_workers {
                let ctx = WorkerContext {
                    worker_id,
                    work_rx: work_rx.clone(),
                    result_tx: result_tx.clone(),
                    processor,
                };
                s.spawn(move |_| worker_thread(ctx));
            }

            // Producer thread: send work to workers
            s.spawn(move |_| {
                for item in work_items.into_iter().enumerate() {
                    if work_tx.send(item).is_err() {
                        break; // Workers dropped
                    }
                }
            });

            // Drop our handles so the result channel closes with the last worker
            drop(work_rx);
            drop(result_tx);

            collect_results(result_rx, total_items)
        })
        .map_err(|_| anyhow::anyhow!("Thread panic occurred during parallel execution"))?;

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, result)| result).collect())
    }
}

fn worker_thread<T, R, F>(ctx: WorkerContext<'_, T, R, F>)
where
    F: Fn(&T) -> R,
{
    while let Ok((index, item)) = ctx.work_rx.recv() {
        let result = (ctx.processor)(&item);
        if ctx.result_tx.send((index, result)).is_err() {
            break; // Receiver dropped
        }
    }
    tracing::trace!(worker = ctx.worker_id, "worker finished");
}

fn collect_results<R>(result_rx: Receiver<(usize, R)>, total_items: usize) -> Vec<(usize, R)> {
    let mut results = Vec::with_capacity(total_items);
    while let Ok(result) = result_rx.recv() {
        results.push(result);
        if results.len() >= total_items {
            break;
        }
    }
    results
}

/// Sequential execution strategy for small batches and debugging
pub struct SequentialExecutor;

impl SequentialExecutor {
    pub fn execute<T, R, F>(work_items: Vec<T>, processor: F) -> Vec<R>
    where
        F: Fn(&T) -> R,
    {
        work_items.iter().map(processor).collect()
    }
}

/// Execution strategy enum for choosing between parallel and sequential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Sequential,
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    pub fn execute<T, R, F>(&self, work_items: Vec<T>, processor: F) -> Result<Vec<R>>
    where
        T: Send,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        match self {
            ExecutionStrategy::Sequential => Ok(SequentialExecutor::execute(work_items, processor)),
            ExecutionStrategy::Parallel { workers } => {
                ParallelExecutor::new(*workers).execute(work_items, processor)
            }
        }
    }

    /// Threshold decision between sequential and parallel execution.
    ///
    /// The caller supplies the worker count it has already adapted to its
    /// workload; this only compares `work_items_count` to the threshold.
    ///
    /// ```rust
    /// use codeweave::parallel::ExecutionStrategy;
    ///
    /// let strategy = ExecutionStrategy::auto(10, 32, 4);
    /// assert!(matches!(strategy, ExecutionStrategy::Sequential));
    ///
    /// let strategy = ExecutionStrategy::auto(100, 32, 4);
    /// assert!(matches!(strategy, ExecutionStrategy::Parallel { workers: 4 }));
    /// ```
    pub fn auto(work_items_count: usize, min_items_for_parallel: usize, optimal_workers: usize) -> Self {
        if work_items_count >= min_items_for_parallel && optimal_workers > 1 {
            ExecutionStrategy::Parallel {
                workers: optimal_workers,
            }
        } else {
            ExecutionStrategy::Sequential
        }
    }

    /// Maximum workers allowed by the CPU count and configuration.
    ///
    /// ```text
    /// 1. cores * thread_percentage / 100, at least 1
    /// 2. capped at max_threads_config when it is non-zero
    /// ```
    pub fn calculate_optimal_workers(max_threads_config: usize, thread_percentage: u8) -> usize {
        let available_cores = num_cpus::get();

        let workers_by_percentage =
            std::cmp::max(1, (available_cores * thread_percentage as usize) / 100);

        // 0 means use percentage calculation only
        if max_threads_config > 0 {
            std::cmp::min(max_threads_config, workers_by_percentage)
        } else {
            workers_by_percentage
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            ExecutionStrategy::Sequential => 1,
            ExecutionStrategy::Parallel { workers } => *workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_sequential_executor() {
        let results = SequentialExecutor::execute(vec![1, 2, 3, 4, 5], |x| x * 2);
        assert_eq!(results, vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_parallel_executor_preserves_input_order() {
        let executor = ParallelExecutor::new(4);
        let work_items: Vec<u64> = (0..64).collect();
        // Early items take longest so they finish last
        let results = executor
            .execute(work_items, |x| {
                std::thread::sleep(Duration::from_micros(64 - x));
                x * 10
            })
            .unwrap();
        assert_eq!(results, (0..64).map(|x| x * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_processor_may_borrow_caller_state() {
        let offsets = vec![100, 200, 300];
        let results = ExecutionStrategy::Parallel { workers: 2 }
            .execute(vec![0usize, 1, 2], |i| offsets[*i] + 1)
            .unwrap();
        assert_eq!(results, vec![101, 201, 301]);
    }

    #[test]
    fn test_empty_input() {
        let results: Vec<i32> = ExecutionStrategy::Parallel { workers: 3 }
            .execute(Vec::<i32>::new(), |x| *x)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_auto_strategy() {
        assert_eq!(ExecutionStrategy::auto(5, 10, 8), ExecutionStrategy::Sequential);
        assert_eq!(
            ExecutionStrategy::auto(15, 10, 8),
            ExecutionStrategy::Parallel { workers: 8 }
        );
        assert_eq!(ExecutionStrategy::auto(15, 10, 1), ExecutionStrategy::Sequential);
    }

    #[test]
    fn test_calculate_optimal_workers() {
        assert!(ExecutionStrategy::calculate_optimal_workers(0, 75) >= 1);
        assert!(ExecutionStrategy::calculate_optimal_workers(2, 100) <= 2);
        assert!(ExecutionStrategy::calculate_optimal_workers(0, 1) >= 1);
    }
}
