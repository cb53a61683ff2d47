#![warn(missing_docs)]

//!
//! In-memory stand-ins for an HTTP request and an HTTP response, for unit testing middleware
//! without a socket or an HTTP server.
//!
//! A `MockRequest` replays a fixed payload as its body. A `MockResponse` records the status
//! code, the headers and every body chunk written to it, and signals when it ends.
//!
//! # Getting Started
//!
//! Build the mocks from their options and hand them to the middleware under test:
//!
//! ## Example
//!
//! ```
//! use mock_req_res::{MockRequest, MockResponse, RequestEvent, RequestOptions};
//!
//! fn middleware(req: &mut MockRequest, res: &mut MockResponse) {
//!     let mut params = Vec::new();
//!
//!     while let Some(event) = req.next_event() {
//!         match event {
//!             RequestEvent::Data(chunk) => params.extend_from_slice(&chunk),
//!             RequestEvent::End => {
//!                 res.set_header("Cache-Control", "max-age=300");
//!                 res.end_with(params.as_slice());
//!             }
//!         }
//!     }
//! }
//!
//! let mut req = MockRequest::new(
//!     RequestOptions::default()
//!         .with_url("/test")
//!         .with_method("POST")
//!         .with_buffer("name=mock&version=first"),
//! );
//! let mut res = MockResponse::default();
//!
//! middleware(&mut req, &mut res);
//!
//! assert!(res.has_ended());
//! assert!(res.headers_sent());
//! assert_eq!(res.status_code().unwrap(), 200);
//! assert_eq!(res.get_header("cache-control").unwrap(), "max-age=300");
//! res.assert_body("name=mock&version=first");
//! ```
//!
//! # Completion callback
//!
//! A response can be given a callback that fires exactly once, when it ends:
//!
//! ## Example
//!
//! ```
//! use mock_req_res::{MockResponse, ResponseOptions};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let calls = Rc::new(Cell::new(0));
//! let counter = calls.clone();
//!
//! let mut res = MockResponse::new(
//!     ResponseOptions::default().with_on_end(move || counter.set(counter.get() + 1)),
//! );
//!
//! res.end();
//! res.end();
//!
//! assert_eq!(calls.get(), 1);
//! ```
//!
//! # Listening for the request body
//!
//! Besides pulling events, listeners can be registered on the request and driven with
//! `resume`. The body is also available as an `http_body::Body` and as a `Stream`.
//!
//! ## Example
//!
//! ```
//! use mock_req_res::{MockRequest, RequestOptions};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let received = Rc::new(RefCell::new(String::new()));
//! let sink = received.clone();
//!
//! let mut req = MockRequest::new(RequestOptions::default().with_buffer("hello").with_chunk_size(2));
//! req.on_data(move |chunk| sink.borrow_mut().push_str(std::str::from_utf8(chunk).unwrap()));
//! req.resume();
//!
//! assert_eq!(*received.borrow(), "hello");
//! assert!(req.is_ended());
//! ```
//!
//! # Middleware chains
//!
//! `Chain` runs several middlewares in order, after normalizing the request so that it always
//! carries a URL and a method. See `Chain` for an example.
//!
//! # Writes after the end
//!
//! Once a response ended, further writes, header changes and calls to `end` are ignored and
//! logged as warnings through the `log` crate.
//!

mod chain;
mod diff;
mod error;
mod headers;
mod request;
mod response;
mod service;

pub use chain::{Chain, Middleware, Next};
pub use error::{Error, ErrorKind};
pub use headers::{HeaderValues, Headers};
pub use request::{MockRequest, RequestEvent, RequestOptions};
pub use response::{MockResponse, ResponseOptions};
pub use service::call_service;
