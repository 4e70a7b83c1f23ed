//! Connection dispatch: listener/session tables and the reactor.

pub mod manager;
pub mod reactor;
pub mod session;

pub use manager::SocketManager;
pub use reactor::{Honeypot, HoneypotHandle};
pub use session::{Session, SessionState};
