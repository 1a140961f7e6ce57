//! Shared (cross-process) algorithm variants: atomic single-round-trip
//! decisions against an external scripting store (spec §4.3). No
//! client-side lock is taken; the store's script execution is the only
//! source of atomicity (spec §5).

pub mod sliding_window;
pub mod store;
pub mod token_bucket;

pub use sliding_window::SharedSlidingWindow;
pub use store::{ScriptResult, SharedStore};
pub use token_bucket::SharedTokenBucket;
