/*
 * mod.rs
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

//! Byte-stream building blocks: the buffered line reader, single-purpose
//! decorators (bounded, concatenating, prefix-replay, write-to-read
//! inversion, digest-while-streaming), and the chunked transfer codec.
//!
//! Every decorator implements `AsyncRead`, owns its own cursor state, and
//! composes with the others by wrapping. One instance, one consumer.

mod bounded;
mod chunked;
mod concat;
mod digest;
mod invert;
mod line_reader;
mod prefix;

pub use bounded::BoundedReader;
pub use chunked::{ChunkedEncoder, ChunkedReader, MIN_CHUNK_BUFFER};
pub use concat::ConcatReader;
pub use digest::{DigestMode, DigestStream};
pub use invert::{
    DeflateDecoder, DeflateEncoder, GzipDecoder, GzipEncoder, InvertedReader, WriteCodec,
    ZlibDecoder, ZlibEncoder,
};
pub use line_reader::LineReader;
pub use prefix::PrefixReader;

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Read from `inner` into at most `limit` bytes of `buf`. Returns the number
/// of bytes transferred.
pub(crate) fn poll_read_limited<R: AsyncRead + Unpin>(
    inner: &mut R,
    cx: &mut Context<'_>,
    buf: &mut ReadBuf<'_>,
    limit: usize,
) -> Poll<io::Result<usize>> {
    let mut sub = buf.take(limit);
    ready!(Pin::new(inner).poll_read(cx, &mut sub))?;
    let n = sub.filled().len();
    // The first n bytes of the sub-buffer were initialized by the inner read.
    unsafe { buf.assume_init(n) };
    buf.advance(n);
    Poll::Ready(Ok(n))
}
