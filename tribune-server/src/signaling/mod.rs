mod relay;
mod session;
mod ws_handler;

pub use relay::*;
pub use session::*;
pub use ws_handler::*;
