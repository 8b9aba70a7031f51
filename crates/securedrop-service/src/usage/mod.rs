//! Usage accounting.

pub mod accountant;

pub use accountant::UsageAccountant;
