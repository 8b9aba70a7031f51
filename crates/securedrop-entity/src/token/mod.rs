//! Access tokens, their policy and the status state machine.

pub mod model;
pub mod policy;
pub mod status;

pub use model::{NewToken, Token};
pub use policy::{FilenameConflictStrategy, TokenPolicy};
pub use status::TokenStatus;
