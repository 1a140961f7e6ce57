//! In-process algorithms, each keyed per-key with fine-grained locking
//! (spec §5: "local algorithms use fine-grained per-key locks").

pub mod leaky_bucket;
pub mod sliding_window_counter;
pub mod sliding_window_log;
pub mod token_bucket;

pub use leaky_bucket::LocalLeakyBucket;
pub use sliding_window_counter::LocalSlidingWindowCounter;
pub use sliding_window_log::LocalSlidingWindowLog;
pub use token_bucket::LocalTokenBucket;
