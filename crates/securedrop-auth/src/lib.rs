//! # securedrop-auth
//!
//! Credential primitives for SecureDrop Exchange.
//!
//! ## Modules
//!
//! - `jwt`: signed admin and guest credentials, told apart by audience
//! - `password`: Argon2id hashing and the admin password policy
//! - `token_string`: CSPRNG generation of guest token strings

pub mod jwt;
pub mod password;
pub mod token_string;

pub use jwt::{AdminClaims, CredentialKind, GuestClaims, IssuedCredential, JwtDecoder, JwtEncoder};
pub use password::{PasswordHasher, PasswordValidator};
pub use token_string::generate_token_string;
