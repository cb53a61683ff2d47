use crate::headers::{HeaderValues, Headers};
use crate::{Error, ErrorKind};
use bytes::{Bytes, BytesMut};
use futures_util::Stream;
use http_body::{Body, Frame, SizeHint};
use http_body_util::Full;
use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

pub(crate) const DEFAULT_URL: &str = "/";
pub(crate) const DEFAULT_METHOD: &str = "GET";

///
/// Configures a `MockRequest`. Every field is optional and falls back to the
/// defaults of a plain `GET /` request without headers or body.
///
/// ## Example
///
/// ```
/// use mock_req_res::{MockRequest, RequestOptions};
///
/// let req = MockRequest::new(
///     RequestOptions::default()
///         .with_url("/test")
///         .with_method("POST")
///         .with_header("Content-Type", "application/x-www-form-urlencoded")
///         .with_buffer("name=mock&version=first"),
/// );
///
/// assert_eq!(req.url, "/test");
/// assert_eq!(req.header("content-type").unwrap(), "application/x-www-form-urlencoded");
/// ```
///
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    /// Defaults to `/`
    pub url: Option<String>,
    /// Defaults to `GET`
    pub method: Option<String>,
    /// Request headers, keyed by lowercased field name
    pub headers: Headers,
    /// The payload replayed as the request body. Defaults to empty.
    pub buffer: Option<Bytes>,
    /// Splits the replayed body into chunks of at most this many bytes.
    /// When unset, the whole buffer is delivered as a single chunk.
    pub chunk_size: Option<usize>,
}

impl RequestOptions {
    /// Sets the request target.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the request method.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    ///
    /// Sets a request header. The field letter case is ignored.
    ///
    pub fn with_header<V: Into<HeaderValues>>(mut self, field: &str, value: V) -> Self {
        self.headers.set(field, value);
        self
    }

    /// Replaces all request headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the payload replayed as the body.
    pub fn with_buffer<StrOrBytes: AsRef<[u8]>>(mut self, buffer: StrOrBytes) -> Self {
        self.buffer = Some(Bytes::copy_from_slice(buffer.as_ref()));
        self
    }

    /// Replays the body in chunks of at most `chunk_size` bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    ///
    /// Uses the serialized `value` as the body and sets `content-type: application/json`.
    ///
    pub fn with_json(mut self, value: serde_json::Value) -> Self {
        self.headers.set("content-type", "application/json");
        self.buffer = Some(Bytes::from(value.to_string()));
        self
    }

    ///
    /// URL-encodes `pairs` into the body and sets the form `content-type`.
    ///
    pub fn with_form(mut self, pairs: &[(&str, &str)]) -> Result<Self, Error> {
        let encoded = serde_urlencoded::to_string(pairs)
            .map_err(|err| Error::new_with_context(ErrorKind::BodyEncodeFailure, err))?;

        self.headers
            .set("content-type", "application/x-www-form-urlencoded");
        self.buffer = Some(Bytes::from(encoded));
        Ok(self)
    }
}

///
/// A notification produced while replaying the request body.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestEvent {
    /// A chunk of the configured body
    Data(Bytes),
    /// Emitted exactly once, after every chunk was delivered
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReplayState {
    Idle,
    Emitting { offset: usize },
    Ended,
}

type DataListener = Box<dyn FnMut(&Bytes)>;
type EndListener = Box<dyn FnOnce()>;

///
/// An in-memory request built from a fixed payload.
///
/// The body can be consumed in three ways, all sharing the same replay state: by pulling
/// events with `next_event`, by registering listeners and calling `resume`, or through the
/// `http_body::Body` and `Stream` implementations. Whichever way is used, data chunks are
/// delivered in order and are followed by a single end of stream.
///
pub struct MockRequest {
    /// The request target. Defaults to `/`.
    pub url: String,
    /// Defaults to `GET`.
    pub method: String,
    /// Request headers, looked up without regard to the field letter case.
    pub headers: Headers,
    buffer: Bytes,
    chunk_size: Option<usize>,
    state: ReplayState,
    data_listeners: Vec<DataListener>,
    end_listeners: Vec<EndListener>,
}

impl MockRequest {
    /// Creates a request, filling in defaults for every unset option.
    pub fn new(options: RequestOptions) -> Self {
        Self {
            url: options.url.unwrap_or_else(|| DEFAULT_URL.to_owned()),
            method: options.method.unwrap_or_else(|| DEFAULT_METHOD.to_owned()),
            headers: options.headers,
            buffer: options.buffer.unwrap_or_default(),
            chunk_size: options.chunk_size,
            state: ReplayState::Idle,
            data_listeners: Vec::new(),
            end_listeners: Vec::new(),
        }
    }

    ///
    /// Builds a request from an `http::Request`, keeping its path and query as the URL.
    ///
    pub fn from_http(request: http::Request<Bytes>) -> Result<Self, Error> {
        let (parts, body) = request.into_parts();
        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(DEFAULT_URL);

        Ok(Self::new(RequestOptions {
            url: Some(url.to_owned()),
            method: Some(parts.method.as_str().to_owned()),
            headers: Headers::from_header_map(&parts.headers)?,
            buffer: Some(body),
            chunk_size: None,
        }))
    }

    ///
    /// Converts the request into an `http::Request` carrying the part of the body that
    /// hasn't been replayed yet.
    ///
    pub fn into_http(mut self) -> Result<http::Request<Full<Bytes>>, Error> {
        let method = http::Method::from_bytes(self.method.as_bytes())
            .map_err(|_| Error::new_with_context(ErrorKind::InvalidMethod, &self.method))?;
        let uri = self
            .url
            .parse::<http::Uri>()
            .map_err(|err| Error::new_with_context(ErrorKind::InvalidUri, err))?;
        let headers = self.headers.to_header_map()?;
        let body = self.read_body();

        let mut request = http::Request::new(Full::new(body));
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        Ok(request)
    }

    ///
    /// Applies the defaults a middleware chain relies on: an empty URL becomes `/` and an
    /// empty method becomes `GET`.
    ///
    pub fn normalize(&mut self) {
        if self.url.is_empty() {
            self.url = DEFAULT_URL.to_owned();
        }

        if self.method.is_empty() {
            self.method = DEFAULT_METHOD.to_owned();
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, field: &str) -> Option<&HeaderValues> {
        self.headers.get(field)
    }

    ///
    /// Returns the next replay event: the body chunks, then `RequestEvent::End` exactly
    /// once, then `None` forever. An empty body produces `End` straight away.
    ///
    pub fn next_event(&mut self) -> Option<RequestEvent> {
        let offset = match self.state {
            ReplayState::Ended => return None,
            ReplayState::Idle => 0,
            ReplayState::Emitting { offset } => offset,
        };

        let len = self.buffer.len();
        if offset < len {
            let end = match self.chunk_size {
                Some(size) if size > 0 => (offset + size).min(len),
                _ => len,
            };
            self.state = ReplayState::Emitting { offset: end };

            Some(RequestEvent::Data(self.buffer.slice(offset..end)))
        } else {
            self.state = ReplayState::Ended;
            log::debug!("request body replay ended for {} {}", self.method, self.url);

            Some(RequestEvent::End)
        }
    }

    ///
    /// Registers a listener invoked with every body chunk delivered by `resume`.
    ///
    pub fn on_data(&mut self, listener: impl FnMut(&Bytes) + 'static) -> &mut Self {
        self.data_listeners.push(Box::new(listener));
        self
    }

    ///
    /// Registers a listener invoked once the body has been fully delivered by `resume`.
    /// Listeners registered after the end of the body never fire.
    ///
    /// Listeners run while `resume` borrows the request, so they can't change it. Share the
    /// response with them through `Rc<RefCell<MockResponse>>`; to rewrite the request based
    /// on its body, read it with `next_event` instead.
    ///
    pub fn on_end(&mut self, listener: impl FnOnce() + 'static) -> &mut Self {
        self.end_listeners.push(Box::new(listener));
        self
    }

    ///
    /// Replays the remaining body into the registered listeners, in registration order,
    /// and finishes with the end listeners. The body is drained even when nobody listens.
    ///
    pub fn resume(&mut self) {
        while let Some(event) = self.next_event() {
            match event {
                RequestEvent::Data(chunk) => {
                    for listener in self.data_listeners.iter_mut() {
                        listener(&chunk);
                    }
                }
                RequestEvent::End => {
                    for listener in std::mem::take(&mut self.end_listeners) {
                        listener();
                    }
                }
            }
        }
    }

    ///
    /// Collects the body chunks that haven't been replayed yet and ends the replay.
    ///
    pub fn read_body(&mut self) -> Bytes {
        let mut body = BytesMut::with_capacity(self.remaining());

        while let Some(event) = self.next_event() {
            if let RequestEvent::Data(chunk) = event {
                body.extend_from_slice(&chunk);
            }
        }

        body.freeze()
    }

    ///
    /// Decodes the configured payload as `application/x-www-form-urlencoded` pairs.
    ///
    pub fn form(&self) -> Result<Vec<(String, String)>, Error> {
        serde_urlencoded::from_bytes(&self.buffer)
            .map_err(|err| Error::new_with_context(ErrorKind::BodyDecodeFailure, err))
    }

    ///
    /// Decodes the configured payload as JSON.
    ///
    pub fn json(&self) -> Result<serde_json::Value, Error> {
        serde_json::from_slice(&self.buffer)
            .map_err(|err| Error::new_with_context(ErrorKind::BodyDecodeFailure, err))
    }

    /// Whether the end of the body has been delivered.
    pub fn is_ended(&self) -> bool {
        self.state == ReplayState::Ended
    }

    fn remaining(&self) -> usize {
        match self.state {
            ReplayState::Idle => self.buffer.len(),
            ReplayState::Emitting { offset } => self.buffer.len() - offset,
            ReplayState::Ended => 0,
        }
    }
}

impl Default for MockRequest {
    fn default() -> Self {
        Self::new(RequestOptions::default())
    }
}

impl fmt::Debug for MockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRequest")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("buffer", &self.buffer)
            .field("state", &self.state)
            .field("data_listeners", &self.data_listeners.len())
            .field("end_listeners", &self.end_listeners.len())
            .finish()
    }
}

impl Body for MockRequest {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let frame = match self.get_mut().next_event() {
            Some(RequestEvent::Data(chunk)) => Some(Ok(Frame::data(chunk))),
            Some(RequestEvent::End) | None => None,
        };

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.remaining() == 0
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining() as u64)
    }
}

impl Stream for MockRequest {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = match self.get_mut().next_event() {
            Some(RequestEvent::Data(chunk)) => Some(chunk),
            Some(RequestEvent::End) | None => None,
        };

        Poll::Ready(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = match self.chunk_size {
            Some(size) if size > 0 => {
                let remaining = self.remaining();
                remaining / size + usize::from(remaining % size != 0)
            }
            _ => usize::from(self.remaining() > 0),
        };

        (chunks, Some(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = MockRequest::default();

        assert_eq!(req.url, "/");
        assert_eq!(req.method, "GET");
        assert!(req.headers.is_empty());
        assert!(!req.is_ended());
    }

    #[test]
    fn test_empty_body_ends_immediately() {
        let mut req = MockRequest::default();

        assert_eq!(req.next_event(), Some(RequestEvent::End));
        assert_eq!(req.next_event(), None);
        assert!(req.is_ended());
    }

    #[test]
    fn test_single_chunk_by_default() {
        let mut req = MockRequest::new(RequestOptions::default().with_buffer("hello world"));

        assert_eq!(
            req.next_event(),
            Some(RequestEvent::Data(Bytes::from_static(b"hello world")))
        );
        assert_eq!(req.next_event(), Some(RequestEvent::End));
        assert_eq!(req.next_event(), None);
    }

    #[test]
    fn test_chunked_replay() {
        let mut req = MockRequest::new(
            RequestOptions::default()
                .with_buffer("abcdefgh")
                .with_chunk_size(3),
        );

        let mut events = Vec::new();
        while let Some(event) = req.next_event() {
            events.push(event);
        }

        assert_eq!(
            events,
            vec![
                RequestEvent::Data(Bytes::from_static(b"abc")),
                RequestEvent::Data(Bytes::from_static(b"def")),
                RequestEvent::Data(Bytes::from_static(b"gh")),
                RequestEvent::End,
            ]
        );
    }

    #[test]
    fn test_zero_chunk_size_means_whole_buffer() {
        let mut req = MockRequest::new(
            RequestOptions::default()
                .with_buffer("abc")
                .with_chunk_size(0),
        );

        assert_eq!(
            req.next_event(),
            Some(RequestEvent::Data(Bytes::from_static(b"abc")))
        );
    }

    #[test]
    fn test_remaining_follows_replay() {
        let mut req = MockRequest::new(
            RequestOptions::default()
                .with_buffer("abcd")
                .with_chunk_size(2),
        );

        assert_eq!(req.remaining(), 4);
        req.next_event();
        assert_eq!(req.remaining(), 2);
        assert_eq!(Stream::size_hint(&req), (1, Some(1)));
        req.next_event();
        assert_eq!(req.remaining(), 0);
        req.next_event();
        assert_eq!(req.remaining(), 0);
        assert!(req.is_ended());
    }

    #[test]
    fn test_stream_size_hint_with_huge_chunk_size() {
        let req = MockRequest::new(
            RequestOptions::default()
                .with_buffer("ab")
                .with_chunk_size(usize::MAX),
        );

        assert_eq!(Stream::size_hint(&req), (1, Some(1)));
    }

    #[test]
    fn test_stream_size_hint_counts_partial_chunk() {
        let req = MockRequest::new(
            RequestOptions::default()
                .with_buffer("abcde")
                .with_chunk_size(2),
        );

        assert_eq!(Stream::size_hint(&req), (3, Some(3)));
    }

    #[test]
    fn test_normalize() {
        let mut req = MockRequest::default();
        req.url.clear();
        req.method.clear();

        req.normalize();

        assert_eq!(req.url, "/");
        assert_eq!(req.method, "GET");
    }
}
