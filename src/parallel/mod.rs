//! Generic parallel execution framework
//!
//! The parallel module only manages system resources and execution strategy:
//! how many workers the machine and configuration allow, and whether a batch
//! is large enough to be worth spreading over them. Deciding what a work item
//! is stays with the caller.
//!
//! Results always come back in input order, whichever strategy ran them.
//!
//! ```rust
//! use codeweave::parallel::ExecutionStrategy;
//!
//! let workers = ExecutionStrategy::calculate_optimal_workers(0, 75);
//! let strategy = ExecutionStrategy::auto(100, 32, workers);
//! let doubled = strategy.execute(vec![1, 2, 3], |x| x * 2).unwrap();
//! assert_eq!(doubled, vec![2, 4, 6]);
//! ```

pub mod core;

pub use core::{ExecutionStrategy, ParallelExecutor, SequentialExecutor};
