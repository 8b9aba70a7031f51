//! JWT encoding, decoding and claims for both credential kinds.

pub mod claims;
pub mod decoder;
pub mod encoder;

pub use claims::{ADMIN_AUDIENCE, AdminClaims, CredentialKind, GUEST_AUDIENCE, GuestClaims};
pub use decoder::JwtDecoder;
pub use encoder::{IssuedCredential, JwtEncoder};
