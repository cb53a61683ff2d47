use std::error::Error as ErrorTrait;
use std::fmt::Display;

///
/// Contains information about an error occurence
///
#[derive(Debug)]
pub struct Error {
    /// The type of this error
    pub kind: ErrorKind,
    /// Some errors come with more context
    pub context: Option<String>,
}

impl Error {
    pub(crate) fn new_with_context(kind: ErrorKind, context: impl Display) -> Error {
        Error {
            kind,
            context: Some(context.to_string()),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (context: {})",
            self.kind.description(),
            self.context.as_deref().unwrap_or("none")
        )
    }
}

impl ErrorTrait for Error {}

///
/// The type of an error
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The status code is invalid or out of range
    InvalidStatusCode,
    /// A header name can't be represented as an HTTP header name
    InvalidHeaderName,
    /// A header value can't be represented as an HTTP header value
    InvalidHeaderValue,
    /// The request method is not a valid HTTP method
    InvalidMethod,
    /// The request URL is not a valid URI
    InvalidUri,
    /// The body could not be decoded into the requested format
    BodyDecodeFailure,
    /// The body could not be encoded from the given values
    BodyEncodeFailure,
    /// The service under test returned an error
    ServiceFailure,
    /// Failed to read the body produced by the service under test
    ResponseBodyFailure,
}

impl ErrorKind {
    fn description(&self) -> &'static str {
        match self {
            ErrorKind::InvalidStatusCode => "invalid status code",
            ErrorKind::InvalidHeaderName => "invalid header name",
            ErrorKind::InvalidHeaderValue => "invalid header value",
            ErrorKind::InvalidMethod => "invalid request method",
            ErrorKind::InvalidUri => "invalid request url",
            ErrorKind::BodyDecodeFailure => "failed to decode the body",
            ErrorKind::BodyEncodeFailure => "failed to encode the body",
            ErrorKind::ServiceFailure => "the service returned an error",
            ErrorKind::ResponseBodyFailure => "failed to read the response body",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_failure_is_not_a_decode_failure() {
        let err = Error::new_with_context(ErrorKind::BodyEncodeFailure, "nested value");

        assert_ne!(err.kind, ErrorKind::BodyDecodeFailure);
        assert_eq!(
            err.to_string(),
            "failed to encode the body (context: nested value)"
        );
    }

    #[test]
    fn test_display_without_context() {
        let err = Error {
            kind: ErrorKind::InvalidMethod,
            context: None,
        };

        assert_eq!(err.to_string(), "invalid request method (context: none)");
    }
}
