use crate::{MockRequest, MockResponse};
use std::fmt;

///
/// A middleware under test. It either produces a response or continues the chain
/// through `Next::run`.
///
pub type Middleware = dyn Fn(&mut MockRequest, &mut MockResponse, Next<'_>);

///
/// The continuation handed to a middleware. Consuming it runs the rest of the chain.
///
pub struct Next<'a> {
    rest: &'a [Box<Middleware>],
    done: &'a mut dyn FnMut(&mut MockRequest, &mut MockResponse),
}

impl<'a> Next<'a> {
    ///
    /// Runs the following middleware, or the final handler once the chain is exhausted.
    ///
    pub fn run(self, req: &mut MockRequest, res: &mut MockResponse) {
        match self.rest.split_first() {
            Some((middleware, rest)) => middleware(
                req,
                res,
                Next {
                    rest,
                    done: self.done,
                },
            ),
            None => (self.done)(req, res),
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.rest.len())
            .finish()
    }
}

///
/// Runs a sequence of middlewares against a request and response pair.
///
/// ## Example
///
/// ```
/// use mock_req_res::Chain;
///
/// let (_req, res) = Chain::new()
///     .with(|req, res, next| {
///         res.set_header("Set-Cookie", ["test=1", "language=de"]);
///         next.run(req, res);
///     })
///     .run(|req, res| {
///         assert_eq!(req.url, "/");
///         assert!(!res.headers_sent());
///     });
///
/// assert_eq!(res.get_header("set-cookie").unwrap(), &["test=1", "language=de"]);
/// assert_eq!(res.status_code(), None);
/// ```
///
#[derive(Default)]
pub struct Chain {
    middlewares: Vec<Box<Middleware>>,
}

impl Chain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Appends a middleware to the chain.
    ///
    pub fn with<F>(mut self, middleware: F) -> Self
    where
        F: Fn(&mut MockRequest, &mut MockResponse, Next<'_>) + 'static,
    {
        self.middlewares.push(Box::new(middleware));
        self
    }

    ///
    /// Normalizes `req`, then runs the middlewares in order. `done` is invoked only if the
    /// last middleware continues the chain.
    ///
    pub fn handle<F>(&self, req: &mut MockRequest, res: &mut MockResponse, mut done: F)
    where
        F: FnMut(&mut MockRequest, &mut MockResponse),
    {
        req.normalize();

        let next = Next {
            rest: &self.middlewares,
            done: &mut done,
        };
        next.run(req, res);
    }

    ///
    /// Runs the chain against a default request and response and returns them.
    ///
    pub fn run<F>(&self, done: F) -> (MockRequest, MockResponse)
    where
        F: FnMut(&mut MockRequest, &mut MockResponse),
    {
        let mut req = MockRequest::default();
        let mut res = MockResponse::default();

        self.handle(&mut req, &mut res, done);

        (req, res)
    }

    /// Number of middlewares in the chain.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the chain has no middleware.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}
