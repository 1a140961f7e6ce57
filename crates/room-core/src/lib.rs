//! Realtime room/lobby management: creation, membership, readiness,
//! host transfer, broadcast, and idle/TTL reaping (spec §4.2).

pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod model;
pub mod room;
pub mod transport;

pub use config::RoomConfig;
pub use error::{Result, RoomError};
pub use events::{CloseReason, Frame, RoomEvent};
pub use manager::Manager;
pub use model::{Page, PlayerSlot, RoomFilter, RoomSnapshot, RoomStatus};
pub use room::Room;
pub use transport::SessionTransport;
