use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No registered recognizer accepted the stream prefix.
    #[error("unrecognized file format")]
    UnrecognizedFileFormat,

    /// Short read, bad magic after a partial match, or an offset pointing
    /// outside of the stream.
    #[error("malformed stream; {0}")]
    MalformedStream(String),

    /// Unknown data format code or otherwise unsupported construct.
    #[error("unsupported feature; {0}")]
    UnsupportedFeature(String),

    /// The input breaks a structural invariant the parser relies on, e.g. a
    /// cyclic IFD chain. Always fatal for the whole parse.
    #[error("invariant violation; {0}")]
    InvariantViolation(String),

    #[error("io error; {0}")]
    Io(io::Error),
}

use Error::*;

impl Error {
    /// Recoverable errors are downgraded to "skip this entry/segment" by the
    /// directory walker and the segment scanner.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MalformedStream(_) | UnsupportedFeature(_))
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Error {
        MalformedStream(msg.into())
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        if value.kind() == io::ErrorKind::UnexpectedEof {
            MalformedStream(format!("short read: {value}"))
        } else {
            Io(value)
        }
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for crate::Error {
    fn from(e: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        convert_parse_error(e, "")
    }
}

pub(crate) fn convert_parse_error(e: nom::Err<nom::error::Error<&[u8]>>, message: &str) -> Error {
    let s = match e {
        nom::Err::Incomplete(_) => format!("{e}; {message}"),
        nom::Err::Error(e) => format!("{}; {message}", e.code.description()),
        nom::Err::Failure(e) => format!("{}; {message}", e.code.description()),
    };

    MalformedStream(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_kinds() {
        let e: Error = io::Error::from(io::ErrorKind::UnexpectedEof).into();
        assert!(matches!(e, MalformedStream(_)));
        assert!(e.is_recoverable());

        let e: Error = io::Error::from(io::ErrorKind::PermissionDenied).into();
        assert!(matches!(e, Io(_)));
        assert!(!e.is_recoverable());

        assert!(!InvariantViolation("cycle".into()).is_recoverable());
    }
}
