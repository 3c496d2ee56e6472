mod history;
mod membership;
mod presence;
mod room;
mod room_command;
mod room_manager;
mod turn;

pub use history::*;
pub use membership::*;
pub use presence::*;
pub use room::*;
pub use room_command::*;
pub use room_manager::*;
pub use turn::*;
