//! Pluggable rate-limiting: local per-process algorithms, shared
//! cross-process variants backed by an atomic scripting store, and a
//! `Decider`/`MultiDimension` composition layer with fail-open
//! semantics (spec §4.3).

pub mod decider;
pub mod error;
pub mod local;
pub mod shared;

pub use decider::{Decider, DenyReason, MultiDimension};
pub use error::{LimiterError, Result};
pub use local::{LocalLeakyBucket, LocalSlidingWindowCounter, LocalSlidingWindowLog, LocalTokenBucket};
pub use shared::{ScriptResult, SharedSlidingWindow, SharedStore, SharedTokenBucket};
