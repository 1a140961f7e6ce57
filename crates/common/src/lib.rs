//! Shared foundation for the systems-core workspace: the error
//! classification every core's error type maps onto, a clock
//! abstraction, a deadline/cancellation primitive, and small id
//! newtypes. Nothing in this crate is domain-specific — the counter,
//! room, rate-limiter, and KV cores each define their own error enum,
//! config, and entity types on top of it.

pub mod clock;
pub mod deadline;
pub mod error;
pub mod ids;

pub use clock::{millis_since_epoch, Clock, ManualClock, SystemClock};
pub use deadline::Deadline;
pub use error::{CoreErrorKind, HasKind};
pub use ids::{NodeId, PlayerId, RoomId};
