/// Push channel client
///
/// One logical connection per session, with typed frames fanned out to
/// registered listeners by event type.
pub mod listeners;
pub mod manager;
pub mod messages;
pub mod transport;

pub use listeners::{DispatchReport, FrameHandler, ListenerId, ListenerRegistry};
pub use manager::{ConnectOutcome, ConnectionEvent, ConnectionManager, ConnectionState};
pub use messages::{event_types, ClientFrame, PushFrame};
pub use transport::{
    Connector, MemoryConnector, MemoryPeer, TransportCommand, TransportEvent, TransportHandle,
    WebSocketConnector,
};
