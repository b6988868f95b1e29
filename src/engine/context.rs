use std::fmt;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engine::errors::RenderError;
use crate::engine::pipeline::{enter, RenderOptions, RenderResult, RenderStage, ViewEngine};
use crate::engine::sink::{GuardedSink, ResponseSink};
use crate::engine::streamer::{Delivery, Streamer};

/// Identifier of a single render request, used to correlate log lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// How a render call ended, from the host's point of view.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// The requested view was delivered.
    Rendered,
    /// The requested view failed; the error view was delivered instead.
    Recovered { error: RenderError },
    /// Nothing could be rendered; the terminal handler produced the response.
    Unrecoverable { error: RenderError },
    /// The client went away; the response was left as is.
    Aborted,
}

impl RenderOutcome {
    pub fn error(&self) -> Option<&RenderError> {
        match self {
            RenderOutcome::Recovered { error } | RenderOutcome::Unrecoverable { error } => Some(error),
            RenderOutcome::Rendered | RenderOutcome::Aborted => None,
        }
    }
}

/// Render capability bound to one request.
///
/// `render` consumes the context, so a request can produce at most one
/// response. Cloning the engine is cheap; create a context per request.
pub struct RenderContext {
    id: RequestId,
    engine: ViewEngine,
    cancel: CancellationToken,
}

impl RenderContext {
    pub(crate) fn new(engine: ViewEngine, cancel: CancellationToken) -> Self {
        Self {
            id: RequestId::new(),
            engine,
            cancel,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Renders `view` and delivers the result to `sink`.
    ///
    /// Whatever happens, the sink sees at most one end event and no data after
    /// it. Render failures are never returned as errors: they are either
    /// recovered by the error view or handed to the terminal handler.
    pub async fn render(
        self,
        view: &str,
        data: Option<Value>,
        options: RenderOptions,
        sink: &mut dyn ResponseSink,
    ) -> RenderOutcome {
        let id = self.id;
        let mut sink = GuardedSink::new(sink);

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                log::debug!("[{id}] cancelled while rendering '{view}'");
                return RenderOutcome::Aborted;
            }
            result = self.engine.render_with_id(id, view, data, options) => result,
        };

        let outcome = match result {
            RenderResult::Document { html, recovered_from } => {
                enter(id, RenderStage::Streaming, view);
                let streamer = Streamer::new(self.engine.chunk_size(), Some(self.cancel.clone()));
                match streamer.deliver(&html, &mut sink).await {
                    Delivery::ClientGone => RenderOutcome::Aborted,
                    Delivery::Completed => match recovered_from {
                        None => RenderOutcome::Rendered,
                        Some(error) => RenderOutcome::Recovered { error },
                    },
                }
            }
            RenderResult::Failed(error) => {
                if self.cancel.is_cancelled() || sink.is_closed() {
                    log::debug!("[{id}] client gone, dropping failure for '{view}': {error}");
                    return RenderOutcome::Aborted;
                }

                let handler = self.engine.options().on_unrecoverable_error.clone();
                handler.handle(&error, &mut sink).await;
                if !sink.is_ended() {
                    if let Err(e) = sink.end().await {
                        log::debug!("[{id}] ending response after handler failed: {e}");
                    }
                }
                RenderOutcome::Unrecoverable { error }
            }
        };

        enter(id, RenderStage::Done, view);
        outcome
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("id", &self.id)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
