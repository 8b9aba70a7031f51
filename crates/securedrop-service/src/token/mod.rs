//! Admin token management and housekeeping.

pub mod reaper;
pub mod service;

pub use reaper::TokenReaper;
pub use service::{CreateTokenRequest, TokenService, UpdateTokenRequest};
