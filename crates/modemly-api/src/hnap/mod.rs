// HNAP API surface
//
// The modem exposes one endpoint, `POST /HNAP1/`, multiplexed by the
// `SOAPAction` header. Transport mechanics live in `client`, the login
// challenge in `auth`, and the status actions in `status`.

mod auth;
pub mod client;
pub mod models;
mod status;

pub use auth::LoginOutcome;
pub use client::HnapClient;
pub use models::Action;
