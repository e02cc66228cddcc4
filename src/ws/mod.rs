pub mod handler;
pub mod protocol;

pub use handler::{ws_handler, WsState};
pub use protocol::{ClientMessage, ServerMessage};
