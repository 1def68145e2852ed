/*
 * bounded.rs
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

//! Length-bounded stream: reads are clipped to a byte budget; once the budget
//! is spent, reads return 0 without touching the inner stream.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use crate::error::HttpError;
use crate::stream::poll_read_limited;

/// Wraps an inner stream with a byte budget. In exact mode, inner
/// end-of-stream before the budget is satisfied is a short-read error instead
/// of a silent truncation; the engine uses this for Content-Length framing.
pub struct BoundedReader<R> {
    inner: R,
    limit: u64,
    remaining: u64,
    exact: bool,
}

impl<R> BoundedReader<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            remaining: limit,
            exact: false,
        }
    }

    /// Budget must be fully delivered by the inner stream; premature
    /// end-of-stream surfaces `HttpError::ShortRead`.
    pub fn new_exact(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            remaining: limit,
            exact: true,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for BoundedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.remaining == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        let limit = me.remaining.min(buf.remaining() as u64) as usize;
        let n = ready!(poll_read_limited(&mut me.inner, cx, buf, limit))?;
        if n == 0 {
            if me.exact {
                let err = HttpError::ShortRead {
                    expected: me.limit,
                    got: me.limit - me.remaining,
                };
                return Poll::Ready(Err(err.into_io()));
            }
            me.remaining = 0;
            return Poll::Ready(Ok(()));
        }
        me.remaining -= n as u64;
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn clips_to_budget_and_stops() {
        let inner: &[u8] = b"0123456789";
        let mut r = BoundedReader::new(inner, 4);
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"0123");
        // Budget spent: further reads report 0 without touching the inner stream.
        let mut buf = [0u8; 4];
        assert_eq!(r.read(&mut buf).await.unwrap(), 0);
        assert_eq!(r.into_inner(), b"456789");
    }

    #[tokio::test]
    async fn budget_larger_than_inner_is_not_an_error_by_default() {
        let inner: &[u8] = b"ab";
        let mut r = BoundedReader::new(inner, 10);
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"ab");
    }

    #[tokio::test]
    async fn exact_mode_rejects_short_input() {
        let inner: &[u8] = b"ab";
        let mut r = BoundedReader::new_exact(inner, 5);
        let mut out = Vec::new();
        let err = r.read_to_end(&mut out).await.unwrap_err();
        match HttpError::from(err) {
            HttpError::ShortRead { expected: 5, got: 2 } => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
