// Core module - Bridging engine
pub mod bridge;
pub mod broadcast;
pub mod dispatcher;
pub mod link;

pub use bridge::Bridge;
pub use broadcast::{Broadcaster, ClientId, ClientSink, QueuedSink};
pub use dispatcher::CommandDispatcher;
pub use link::{LinkManager, LinkOpener, PortEnumerator};
