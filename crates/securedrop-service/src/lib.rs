//! # securedrop-service
//!
//! Business logic service layer for SecureDrop Exchange. Each service
//! orchestrates repositories, the guarded store and the credential
//! primitives to implement one part of the token lifecycle.
//!
//! Services follow constructor injection; all dependencies are provided
//! at construction time via `Arc` references.

pub mod access;
pub mod admin;
pub mod context;
pub mod exchange;
pub mod guest;
pub mod token;
pub mod usage;

pub use access::AccessLogService;
pub use admin::{AdminAuthService, AdminLogin};
pub use context::RequestContext;
pub use exchange::{FileGateway, PreparedDownload, UploadOutcome};
pub use guest::{GuestLogin, GuestSession, SessionIssuer};
pub use token::{CreateTokenRequest, TokenReaper, TokenService, UpdateTokenRequest};
pub use usage::UsageAccountant;
