// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for datagram framing and transport.

use std::fmt;
use std::io;

/// Errors surfaced by writers, readers and endpoints.
///
/// A datagram that does not match the configured protocol is not an error:
/// [`Endpoint::receive`](crate::Endpoint::receive) reports it as `Ok(None)`.
#[derive(Debug)]
pub enum Error {
    /// A write would exceed the writer's remaining capacity.
    Overflow { requested: usize, remaining: usize },
    /// A received length prefix exceeds [`MAX_PAYLOAD`](crate::config::MAX_PAYLOAD).
    LengthOverflow { length: u16 },
    /// A read needs more bytes than the datagram holds.
    Truncated { needed: usize, available: usize },
    /// The writer has already released its buffer.
    ClosedWriter,
    /// The reader has already returned its buffer.
    ClosedReader,
    /// Socket failure, including an expired deadline (see [`Error::is_timeout`]).
    Io(io::Error),
}

impl Error {
    /// True if the error is an expired send/receive deadline.
    ///
    /// Deadlines are retryable: a receive loop can check its own stop
    /// condition and call `receive` again.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// True for closed-use errors on either side.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::ClosedWriter | Error::ClosedReader)
    }
}

/// True if `err` is an expired send/receive deadline (free-function form of
/// [`Error::is_timeout`]).
#[must_use]
pub fn is_timeout(err: &Error) -> bool {
    err.is_timeout()
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Overflow {
                requested,
                remaining,
            } => write!(
                f,
                "overflow: {} bytes requested, {} remaining",
                requested, remaining
            ),
            Error::LengthOverflow { length } => {
                write!(f, "overflow: length prefix {} exceeds max payload", length)
            }
            Error::Truncated { needed, available } => write!(
                f,
                "truncated datagram: {} bytes needed, {} available",
                needed, available
            ),
            Error::ClosedWriter => write!(f, "closed writer"),
            Error::ClosedReader => write!(f, "closed reader"),
            Error::Io(err) => write!(f, "transport error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_variants() {
        let err = Error::Overflow {
            requested: 8,
            remaining: 4,
        };
        assert_eq!(err.to_string(), "overflow: 8 bytes requested, 4 remaining");

        let err = Error::Truncated {
            needed: 8,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "truncated datagram: 8 bytes needed, 3 available"
        );

        assert_eq!(Error::ClosedReader.to_string(), "closed reader");
        assert_eq!(Error::ClosedWriter.to_string(), "closed writer");
    }

    #[test]
    fn test_timeout_classification() {
        let would_block = Error::from(io::Error::from(io::ErrorKind::WouldBlock));
        let timed_out = Error::from(io::Error::from(io::ErrorKind::TimedOut));
        let refused = Error::from(io::Error::from(io::ErrorKind::ConnectionRefused));

        assert!(would_block.is_timeout());
        assert!(timed_out.is_timeout());
        assert!(!refused.is_timeout());
        assert!(!Error::ClosedReader.is_timeout());

        assert!(is_timeout(&would_block));
        assert!(!is_timeout(&refused));
    }

    #[test]
    fn test_io_source_is_preserved() {
        use std::error::Error as _;
        let err = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(err.source().is_some());
        assert!(Error::ClosedWriter.source().is_none());
    }
}
