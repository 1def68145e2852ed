/*
 * prefix.rs
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

//! Prefix-replay stream: serves a small buffer first (across as many partial
//! reads as it takes), then falls through to the inner stream. Used to
//! "un-read" bytes peeked for content sniffing.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};

pub struct PrefixReader<R> {
    prefix: Bytes,
    pos: usize,
    inner: R,
}

impl<R> PrefixReader<R> {
    pub fn new(prefix: impl Into<Bytes>, inner: R) -> Self {
        Self {
            prefix: prefix.into(),
            pos: 0,
            inner,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for PrefixReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.pos < me.prefix.len() {
            let n = (me.prefix.len() - me.pos).min(buf.remaining());
            buf.put_slice(&me.prefix[me.pos..me.pos + n]);
            me.pos += n;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut me.inner).poll_read(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn prefix_served_before_inner() {
        let inner: &[u8] = b" world";
        let mut r = PrefixReader::new(&b"hello"[..], inner);
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn prefix_survives_partial_reads() {
        let inner: &[u8] = b"cd";
        let mut r = PrefixReader::new(&b"ab"[..], inner);
        let mut one = [0u8; 1];
        assert_eq!(r.read(&mut one).await.unwrap(), 1);
        assert_eq!(one[0], b'a');
        assert_eq!(r.read(&mut one).await.unwrap(), 1);
        assert_eq!(one[0], b'b');
        let mut rest = Vec::new();
        r.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"cd");
    }

    #[tokio::test]
    async fn empty_prefix_is_transparent() {
        let inner: &[u8] = b"data";
        let mut r = PrefixReader::new(Bytes::new(), inner);
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"data");
    }
}
