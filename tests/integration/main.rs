//! Integration tests driving the full router in-process.

mod helpers;

mod admin_test;
mod concurrency_test;
mod download_test;
mod guest_test;
mod upload_test;
