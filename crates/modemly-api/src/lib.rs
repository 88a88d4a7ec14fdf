// modemly-api: Async Rust client for the HNAP status interface of cable modems

pub mod auth;
pub mod error;
pub mod hnap;
pub mod transport;

pub use auth::HnapSession;
pub use error::Error;
pub use hnap::{Action, HnapClient, LoginOutcome};
pub use transport::{TlsMode, TransportConfig};
