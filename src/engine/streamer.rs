use http::header::CONTENT_TYPE;
use http::HeaderValue;
use tokio_util::sync::CancellationToken;

use crate::engine::sink::ResponseSink;

/// Default size of a single data event.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Result of handing a document to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// All bytes written, followed by one end event.
    Completed,
    /// The client went away (closed sink, failed write or cancellation); writing stopped.
    ClientGone,
}

/// Delivers rendered markup to a response sink as a sequence of byte chunks.
#[derive(Debug, Clone)]
pub struct Streamer {
    chunk_size: usize,
    cancel: Option<CancellationToken>,
}

impl Default for Streamer {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: None,
        }
    }
}

impl Streamer {
    pub fn new(chunk_size: usize, cancel: Option<CancellationToken>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            cancel,
        }
    }

    fn client_gone(&self, sink: &dyn ResponseSink) -> bool {
        sink.is_closed() || self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// Sets the HTML content type, writes `markup` and ends the response.
    ///
    /// Never raises: a client that disconnects mid-stream only stops the writes.
    pub async fn deliver(&self, markup: &str, sink: &mut dyn ResponseSink) -> Delivery {
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));

        for chunk in markup.as_bytes().chunks(self.chunk_size) {
            if self.client_gone(sink) {
                log::debug!("client gone, stopping delivery");
                return Delivery::ClientGone;
            }
            if let Err(e) = sink.write(chunk).await {
                log::debug!("write to response sink failed: {e}");
                return Delivery::ClientGone;
            }
        }

        if self.client_gone(sink) {
            return Delivery::ClientGone;
        }
        match sink.end().await {
            Ok(()) => Delivery::Completed,
            Err(e) => {
                log::debug!("ending response failed: {e}");
                Delivery::ClientGone
            }
        }
    }
}
