/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Telaio, a raw-socket HTTP/1.1 client library.
 *
 * Telaio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Telaio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Telaio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Exchange errors: one enumerated kind per failure class. Callers match on the
//! kind; nothing in the client signals failure by unwinding.

use std::fmt;
use std::io;

/// Errors from an HTTP exchange or from one of the body stream decorators.
#[derive(Debug)]
pub enum HttpError {
    /// Scheme is not http/https, or protocol version is not 1.1. Raised before any I/O.
    Unsupported(String),
    /// The response violates HTTP/1.1 framing (status line, headers, chunk framing).
    Malformed(String),
    /// Declared length not satisfied by the stream; never silently truncated.
    ShortRead { expected: u64, got: u64 },
    /// Programmer error in the handler/stream configuration.
    Configuration(String),
    /// Chunk encoder asked to frame into a buffer below the minimum framing overhead.
    ChunkBufferTooSmall { needed: usize, got: usize },
    /// Caller deadline or cancellation signal triggered at a suspension point.
    Cancelled,
    /// Transport failure (socket, TLS); propagated unchanged, no retry here.
    Io(io::Error),
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::Unsupported(m) => write!(f, "unsupported protocol: {}", m),
            HttpError::Malformed(m) => write!(f, "malformed response: {}", m),
            HttpError::ShortRead { expected, got } => {
                write!(f, "short read: expected {} bytes, got {}", expected, got)
            }
            HttpError::Configuration(m) => write!(f, "configuration error: {}", m),
            HttpError::ChunkBufferTooSmall { needed, got } => write!(
                f,
                "chunk output buffer too small: need at least {} bytes for size line, two CRLFs and one data byte, got {}",
                needed, got
            ),
            HttpError::Cancelled => write!(f, "exchange cancelled"),
            HttpError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HttpError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for HttpError {
    /// Recover a domain error smuggled through an `io::Error` by a stream
    /// decorator; anything else is a transport failure.
    fn from(e: io::Error) -> Self {
        match e.downcast::<HttpError>() {
            Ok(he) => he,
            Err(e) => HttpError::Io(e),
        }
    }
}

impl HttpError {
    /// Wrap into an `io::Error` for surfacing from `AsyncRead`/`AsyncWrite`
    /// implementations. `From<io::Error>` above round-trips it back.
    pub fn into_io(self) -> io::Error {
        match self {
            HttpError::Io(e) => e,
            HttpError::Cancelled => io::Error::new(io::ErrorKind::TimedOut, self),
            HttpError::ShortRead { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, self),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
