//! Live room coordinator for text and voice debates.
//!
//! Each active debate gets one [`room::Room`] task that owns presence, chat
//! history and floor control for that debate. Connections talk to rooms
//! through the [`room::RoomManager`]; voice peers negotiate media through the
//! room's signaling relay and then talk directly.

pub mod app;
pub mod config;
pub mod directory;
pub mod error;
pub mod room;
pub mod signaling;
pub mod transport;

pub use app::{AppState, router};
pub use config::{RoomConfig, ServerConfig};
pub use directory::{DebateDirectory, InMemoryDebateDirectory};
pub use error::{RoomError, RoomResult};
pub use room::*;
pub use signaling::*;
pub use transport::*;
