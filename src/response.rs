use crate::diff;
use crate::headers::{HeaderValues, Headers};
use crate::{Error, ErrorKind};
use bytes::{Bytes, BytesMut};
use http::StatusCode;
use http_body_util::Full;
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

type Callback = Box<dyn FnOnce()>;

///
/// Configures a `MockResponse`.
///
#[derive(Default)]
pub struct ResponseOptions {
    /// Invoked once, with no arguments, when the response ends.
    pub on_end: Option<Box<dyn FnOnce()>>,
}

impl ResponseOptions {
    /// Sets the completion callback.
    pub fn with_on_end(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for ResponseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseOptions")
            .field("on_end", &self.on_end.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

///
/// An in-memory response that records what a middleware does to it.
///
/// A response starts out *fresh*: no status code, no headers sent. The first write (or an
/// explicit `flush_headers`) sends the headers, defaulting the status code to `200`. `end`
/// moves it to its terminal state and invokes the completion callback exactly once.
/// Anything that would mutate an ended response is ignored and logged as a warning; ending
/// it again is a silent no-op.
///
/// ## Example
///
/// ```
/// use mock_req_res::MockResponse;
///
/// let mut res = MockResponse::default();
///
/// res.write_head(200).unwrap();
/// res.write("this is a test");
/// res.end();
///
/// assert!(res.headers_sent());
/// assert!(res.has_ended());
/// assert_eq!(res.status_code().unwrap(), 200);
/// assert_eq!(res.get_buffer(), b"this is a test");
/// ```
///
pub struct MockResponse {
    status: Option<StatusCode>,
    headers: Headers,
    body: BytesMut,
    headers_sent: bool,
    ended: bool,
    on_end: Option<Callback>,
    finish_listeners: Vec<Callback>,
}

impl MockResponse {
    /// Creates a fresh response.
    pub fn new(options: ResponseOptions) -> Self {
        Self {
            status: None,
            headers: Headers::new(),
            body: BytesMut::new(),
            headers_sent: false,
            ended: false,
            on_end: options.on_end,
            finish_listeners: Vec::new(),
        }
    }

    ///
    /// The status code, if one was set explicitly or defaulted by sending the headers.
    ///
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether the headers were sent by a write, a flush or the end.
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Whether the response reached its terminal state.
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// All headers set so far.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    ///
    /// Stores `value` under the field `name`, ignoring the letter case. The value can be a
    /// single string or a list of strings, e.g. for multiple `Set-Cookie` entries.
    ///
    /// Headers can still be changed after they were sent, but not after the response ended.
    ///
    /// ## Example
    ///
    /// ```
    /// use mock_req_res::MockResponse;
    ///
    /// let mut res = MockResponse::default();
    /// res.set_header("Set-Cookie", ["test=1", "language=de"]);
    ///
    /// assert_eq!(res.get_header("set-cookie").unwrap(), &["test=1", "language=de"]);
    /// ```
    ///
    pub fn set_header<V: Into<HeaderValues>>(&mut self, name: &str, value: V) {
        if self.ignored_after_end("set_header") {
            return;
        }

        self.headers.set(name, value);
    }

    /// Case-insensitive lookup.
    pub fn get_header(&self, name: &str) -> Option<&HeaderValues> {
        self.headers.get(name)
    }

    /// Case-insensitive presence check.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains(name)
    }

    /// Removes the field and returns its values, if it was present.
    pub fn remove_header(&mut self, name: &str) -> Option<HeaderValues> {
        if self.ignored_after_end("remove_header") {
            return None;
        }

        self.headers.remove(name)
    }

    ///
    /// Sets the status code. This doesn't send the headers; the first write does.
    ///
    /// Fails with `ErrorKind::InvalidStatusCode` for codes outside `100..=999`.
    ///
    pub fn write_head(&mut self, status: u16) -> Result<(), Error> {
        self.write_head_with_headers(status, std::iter::empty::<(&str, &str)>())
    }

    ///
    /// Same as `write_head`, merging each of `headers` as if set with `set_header`.
    ///
    /// ## Example
    ///
    /// ```
    /// use mock_req_res::MockResponse;
    ///
    /// let mut res = MockResponse::default();
    /// res.write_head_with_headers(200, [("Cache-Control", "max-age=300")]).unwrap();
    ///
    /// assert_eq!(res.get_header("cache-control").unwrap(), "max-age=300");
    /// assert!(!res.headers_sent());
    /// ```
    ///
    pub fn write_head_with_headers<I, K, V>(&mut self, status: u16, headers: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<HeaderValues>,
    {
        if self.ignored_after_end("write_head") {
            return Ok(());
        }

        let status = StatusCode::from_u16(status)
            .map_err(|_| Error::new_with_context(ErrorKind::InvalidStatusCode, status))?;

        self.status = Some(status);
        for (name, value) in headers {
            self.headers.set(name.as_ref(), value);
        }

        Ok(())
    }

    ///
    /// Sends the headers without writing any body.
    ///
    pub fn flush_headers(&mut self) {
        if self.ignored_after_end("flush_headers") {
            return;
        }

        self.send_headers();
    }

    ///
    /// Appends `chunk` to the body, sending the headers first if needed.
    ///
    /// Returns `false` when the chunk was ignored because the response already ended.
    ///
    pub fn write<StrOrBytes: AsRef<[u8]>>(&mut self, chunk: StrOrBytes) -> bool {
        if self.ignored_after_end("write") {
            return false;
        }

        self.record(chunk.as_ref());
        true
    }

    ///
    /// Ends the response. Calling it again has no effect and doesn't invoke the completion
    /// callback a second time.
    ///
    pub fn end(&mut self) {
        if self.ended {
            log::debug!("response already ended");
            return;
        }

        self.finish();
    }

    ///
    /// Writes a final `chunk`, then ends the response. On an ended response the chunk is
    /// dropped.
    ///
    pub fn end_with<StrOrBytes: AsRef<[u8]>>(&mut self, chunk: StrOrBytes) {
        if self.ignored_after_end("end_with") {
            return;
        }

        self.record(chunk.as_ref());
        self.finish();
    }

    ///
    /// Registers a listener invoked after the completion callback when the response ends.
    /// Listeners registered after the end never fire.
    ///
    pub fn on_finish(&mut self, listener: impl FnOnce() + 'static) -> &mut Self {
        self.finish_listeners.push(Box::new(listener));
        self
    }

    ///
    /// The accumulated body, in the order the chunks were written.
    ///
    pub fn get_buffer(&self) -> &[u8] {
        &self.body
    }

    ///
    /// The accumulated body as text. Invalid UTF-8 sequences are replaced.
    ///
    pub fn get_buffer_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    ///
    /// Decodes the accumulated body as JSON.
    ///
    pub fn json(&self) -> Result<serde_json::Value, Error> {
        serde_json::from_slice(&self.body)
            .map_err(|err| Error::new_with_context(ErrorKind::BodyDecodeFailure, err))
    }

    ///
    /// Copies everything `reader` produces into the body, then ends the response the way a
    /// piping producer would.
    ///
    pub fn pipe_from<R: io::Read>(&mut self, mut reader: R) -> io::Result<u64> {
        let copied = io::copy(&mut reader, self)?;
        self.end();

        Ok(copied)
    }

    ///
    /// Asserts that the accumulated body equals `expected`, panicking with a diff otherwise.
    ///
    #[track_caller]
    pub fn assert_body(&self, expected: &str) {
        let actual = self.get_buffer_str();
        let matched = actual == expected;

        let message = if !matched {
            format!(
                "\n> Expected response body:\n{}\n> ...but received:\n{}\n> Difference:\n{}\n",
                expected,
                actual,
                diff::compare(expected, &actual)
            )
        } else {
            String::default()
        };

        assert!(matched, "{}", message)
    }

    ///
    /// Builds an `http::Response` out of the recorded state. The status code defaults to `200`.
    ///
    pub fn to_http(&self) -> Result<http::Response<Full<Bytes>>, Error> {
        let headers = self.headers.to_header_map()?;
        let body = Bytes::copy_from_slice(&self.body);

        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = headers;

        Ok(response)
    }

    fn record(&mut self, chunk: &[u8]) {
        self.send_headers();
        self.body.extend_from_slice(chunk);
    }

    fn send_headers(&mut self) {
        let status = *self.status.get_or_insert(StatusCode::OK);

        if !self.headers_sent {
            self.headers_sent = true;
            log::debug!("response headers sent with status {}", status);
        }
    }

    fn finish(&mut self) {
        self.send_headers();
        self.ended = true;
        log::debug!("response ended after {} body bytes", self.body.len());

        if let Some(on_end) = self.on_end.take() {
            on_end();
        }

        for listener in std::mem::take(&mut self.finish_listeners) {
            listener();
        }
    }

    fn ignored_after_end(&self, operation: &str) -> bool {
        if self.ended {
            log::warn!("Ignoring {}() on a response that already ended", operation);
        }

        self.ended
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new(ResponseOptions::default())
    }
}

impl fmt::Debug for MockResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.get_buffer_str())
            .field("headers_sent", &self.headers_sent)
            .field("ended", &self.ended)
            .finish()
    }
}

impl io::Write for MockResponse {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        MockResponse::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsyncWrite for MockResponse {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        MockResponse::write(self.get_mut(), buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.get_mut().end();
        Poll::Ready(Ok(()))
    }
}
