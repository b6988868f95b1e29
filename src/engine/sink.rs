//! Response sinks: the only host primitives the render pipeline needs.
//!
//! A sink receives an optional status, headers, zero or more data chunks and
//! exactly one end-of-response. Hosts either implement [`ResponseSink`] on their
//! own response type, stream a [`ChannelSink`] into their body, or collect a
//! whole [`http::Response`] through [`HttpResponseSink`].

use std::io;

use async_trait::async_trait;
use futures::Stream;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tokio::sync::mpsc;

#[async_trait]
pub trait ResponseSink: Send {
    /// Sets the response status. Hosts that fix the status elsewhere may ignore it.
    fn set_status(&mut self, _status: StatusCode) {}

    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()>;

    async fn end(&mut self) -> io::Result<()>;

    /// True once the client side has gone away.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Event emitted by a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Status(StatusCode),
    Header(HeaderName, HeaderValue),
    Data(Vec<u8>),
    End,
}

/// Sink that forwards every event over a bounded tokio channel.
///
/// Status and header events are held back and sent, in call order, ahead of
/// the next data or end event, so a full channel delays them instead of
/// dropping them.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SinkEvent>,
    pending: Vec<SinkEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (ChannelSink, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            ChannelSink {
                tx,
                pending: Vec::new(),
            },
            rx,
        )
    }

    /// Turns the receiving half into a stream, e.g. for a streaming HTTP body.
    pub fn into_stream(rx: mpsc::Receiver<SinkEvent>) -> impl Stream<Item = SinkEvent> {
        futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })
    }

    async fn send(&mut self, event: SinkEvent) -> io::Result<()> {
        for pending in std::mem::take(&mut self.pending) {
            self.tx.send(pending).await.map_err(|_| Self::closed())?;
        }
        self.tx.send(event).await.map_err(|_| Self::closed())
    }

    fn closed() -> io::Error {
        io::Error::new(io::ErrorKind::BrokenPipe, "response receiver dropped")
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    fn set_status(&mut self, status: StatusCode) {
        self.pending.push(SinkEvent::Status(status));
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.pending.push(SinkEvent::Header(name, value));
    }

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.send(SinkEvent::Data(chunk.to_vec())).await
    }

    async fn end(&mut self) -> io::Result<()> {
        self.send(SinkEvent::End).await
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Sink that assembles a fully buffered [`http::Response`].
#[derive(Debug)]
pub struct HttpResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    ended: bool,
}

impl Default for HttpResponseSink {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            ended: false,
        }
    }
}

impl HttpResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn into_response(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[async_trait]
impl ResponseSink for HttpResponseSink {
    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.body.extend_from_slice(chunk);
        Ok(())
    }

    async fn end(&mut self) -> io::Result<()> {
        self.ended = true;
        Ok(())
    }
}

/// Enforces the sink contract on top of any host sink: at most one end event,
/// and no data after it.
pub(crate) struct GuardedSink<'a> {
    inner: &'a mut dyn ResponseSink,
    ended: bool,
}

impl<'a> GuardedSink<'a> {
    pub(crate) fn new(inner: &'a mut dyn ResponseSink) -> Self {
        Self {
            inner,
            ended: false,
        }
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.ended
    }
}

#[async_trait]
impl<'a> ResponseSink for GuardedSink<'a> {
    fn set_status(&mut self, status: StatusCode) {
        if !self.ended {
            self.inner.set_status(status);
        }
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.ended {
            self.inner.set_header(name, value);
        }
    }

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.ended {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "write after end of response",
            ));
        }
        self.inner.write(chunk).await
    }

    async fn end(&mut self) -> io::Result<()> {
        if self.ended {
            return Ok(());
        }
        self.ended = true;
        self.inner.end().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
