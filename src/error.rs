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
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error {
            kind,
            context: None,
        }
    }

    pub(crate) fn new_with_context(kind: ErrorKind, context: impl Display) -> Error {
        Error {
            kind,
            context: Some(context.to_string()),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, self.context.as_ref()) {
            // The mismatch message is already complete
            (ErrorKind::InvalidPath, Some(context)) => f.write_str(context),
            (kind, Some(context)) => write!(f, "{}: {}", kind.description(), context),
            (kind, None) => f.write_str(kind.description()),
        }
    }
}

impl ErrorTrait for Error {}

///
/// The type of an error
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The options don't describe a valid response
    Configuration,
    /// The requested address could not be bound
    BindAddress,
    /// A request didn't match the configured method and path
    InvalidPath,
    /// The server thread could not be started
    ServerFailure,
    /// Failed to read the request body
    RequestBodyFailure,
    /// Could not build a response
    ResponseFailure,
}

impl ErrorKind {
    fn description(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "invalid responder configuration",
            ErrorKind::BindAddress => "Unable to bind address",
            ErrorKind::InvalidPath => "invalid request",
            ErrorKind::ServerFailure => "the server could not be started",
            ErrorKind::RequestBodyFailure => "failed to read the request body",
            ErrorKind::ResponseFailure => "could not deliver a response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_context() {
        let err = Error::new_with_context(
            ErrorKind::BindAddress,
            "127.0.0.1:5000: Address already in use (os error 98)",
        );

        assert_eq!(
            "Unable to bind address: 127.0.0.1:5000: Address already in use (os error 98)",
            err.to_string()
        );
    }

    #[test]
    fn test_display_without_context() {
        let err = Error::new(ErrorKind::ServerFailure);

        assert_eq!("the server could not be started", err.to_string());
    }

    #[test]
    fn test_invalid_path_displays_the_message_verbatim() {
        let err = Error::new_with_context(
            ErrorKind::InvalidPath,
            "Invalid GET request made to \"/doesnt/exist\"",
        );

        assert_eq!("Invalid GET request made to \"/doesnt/exist\"", err.to_string());
    }
}
