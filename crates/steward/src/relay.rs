//! Offline relay: the authenticated channel for submitting commands when
//! live listening is unavailable. Newline-delimited JSON over TCP, one
//! command per exchange.

pub mod protocol;
pub mod server;
pub mod sessions;

pub use protocol::{RelayRequest, RelayResponse, RelayStatus};
pub use server::RelayServer;
pub use sessions::{RelaySession, SessionStore};
