//! Guest sessions.

pub mod issuer;

pub use issuer::{GuestLogin, GuestSession, SessionIssuer};
