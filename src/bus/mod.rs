pub mod connection_manager;
pub mod event_bus;
pub mod fanout;

pub use connection_manager::{ConnectionId, ConnectionManager};
pub use event_bus::{EventBus, SubscriptionId};
pub use fanout::EventDomain;
