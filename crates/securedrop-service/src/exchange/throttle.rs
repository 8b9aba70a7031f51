//! Bandwidth pacing for streamed downloads.

use std::time::Duration;

use futures::StreamExt;

use securedrop_core::traits::storage::ByteStream;

/// Sleep after each chunk so the stream averages `bytes_per_second`.
pub fn throttle(stream: ByteStream, bytes_per_second: u64) -> ByteStream {
    let rate = bytes_per_second.max(1) as f64;
    Box::pin(stream.then(move |chunk| async move {
        if let Ok(bytes) = &chunk {
            let pause = Duration::from_secs_f64(bytes.len() as f64 / rate);
            tokio::time::sleep(pause).await;
        }
        chunk
    }))
}
