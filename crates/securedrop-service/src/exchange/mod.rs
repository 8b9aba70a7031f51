//! Guest file exchange: policy checks, guarded I/O and range serving.

pub mod gateway;
pub mod range;
pub mod throttle;

pub use gateway::{FileGateway, PreparedDownload, UploadOutcome};
pub use range::{ByteRange, RangeSelection, select_range};
