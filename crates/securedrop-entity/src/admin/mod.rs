//! Administrator principal.

pub mod model;

pub use model::{Admin, CreateAdmin};
