pub mod hub;
pub mod participants;
pub mod presence;
pub mod relay;
pub mod room;
pub mod router;
pub mod session;
pub mod socket;

pub use hub::Hub;
pub use socket::websocket_handler;
