use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};

use crate::engine::errors::RenderError;
use crate::engine::sink::ResponseSink;

/// Last-resort handler, called when a render failed and the error view could
/// not take over. It is expected to produce some visible response on `sink`;
/// the pipeline ends the response afterwards if the handler did not.
#[async_trait]
pub trait UnrecoverableErrorHandler: Send + Sync {
    async fn handle(&self, error: &RenderError, sink: &mut dyn ResponseSink);
}

/// Default terminal handler: logs the error and answers with a plain-text 500.
#[derive(Debug, Clone)]
pub struct LogAndRespond {
    body: String,
}

impl Default for LogAndRespond {
    fn default() -> Self {
        Self {
            body: "An error occurred".to_string(),
        }
    }
}

impl LogAndRespond {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl UnrecoverableErrorHandler for LogAndRespond {
    async fn handle(&self, error: &RenderError, sink: &mut dyn ResponseSink) {
        log::error!("unrecoverable render error: {error}");

        sink.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        sink.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        if let Err(e) = sink.write(self.body.as_bytes()).await {
            log::debug!("cannot write failure body: {e}");
            return;
        }
        let _ = sink.end().await;
    }
}
