/*
 * line_reader.rs
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

//! Buffered reader over one forward-only stream: CRLF-terminated lines and
//! raw byte reads share a single fixed-size buffer, so binary reads resume
//! exactly where line reads left off.
//!
//! The scan logic never touches the source; the only suspension point is the
//! refill. Async methods exist for `AsyncRead` sources, blocking twins for
//! `std::io::Read`, with identical semantics.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Buffered line/binary reader. The internal buffer capacity is fixed at
/// construction; a capacity of 1 still yields correct lines (the terminator
/// may arrive one byte per refill).
pub struct LineReader<S> {
    inner: S,
    buf: Box<[u8]>,
    /// Next unread byte in `buf`.
    pos: usize,
    /// End of the valid region in `buf`.
    filled: usize,
    /// Source reported end-of-stream.
    eof: bool,
    preserve_line_endings: bool,
    /// Partial line accumulated across refills.
    line_buf: Vec<u8>,
}

impl<S> LineReader<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_SIZE)
    }

    /// `capacity` must be at least 1.
    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner,
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            filled: 0,
            eof: false,
            preserve_line_endings: false,
            line_buf: Vec::new(),
        }
    }

    /// When set, `read_line` keeps the trailing CRLF on returned lines.
    pub fn preserve_line_endings(mut self, preserve: bool) -> Self {
        self.preserve_line_endings = preserve;
        self
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn buffered(&self) -> &[u8] {
        &self.buf[self.pos..self.filled]
    }

    /// Scan buffered bytes for the 2-byte terminator, accumulating into
    /// `line_buf`. Returns true once a complete line is in `line_buf` and the
    /// terminator has been consumed. The terminator may be split across
    /// refills; a trailing CR left in `line_buf` marks that boundary.
    fn scan_line(&mut self) -> bool {
        if self.line_buf.last() == Some(&b'\r') && self.buffered().first() == Some(&b'\n') {
            self.pos += 1;
            if self.preserve_line_endings {
                self.line_buf.push(b'\n');
            } else {
                self.line_buf.pop();
            }
            return true;
        }
        let data = &self.buf[self.pos..self.filled];
        let mut i = 0;
        while i + 1 < data.len() {
            if data[i] == b'\r' && data[i + 1] == b'\n' {
                self.line_buf.extend_from_slice(&data[..i]);
                if self.preserve_line_endings {
                    self.line_buf.extend_from_slice(b"\r\n");
                }
                self.pos += i + 2;
                return true;
            }
            i += 1;
        }
        self.line_buf.extend_from_slice(data);
        self.pos = self.filled;
        false
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.line_buf).into_owned();
        self.line_buf.clear();
        line
    }

    /// Final line at end-of-stream: `None` when nothing was accumulated, the
    /// unterminated remainder otherwise.
    fn line_at_eof(&mut self) -> Option<String> {
        if self.line_buf.is_empty() {
            None
        } else {
            Some(self.take_line())
        }
    }
}

impl<S: AsyncRead + Unpin> LineReader<S> {
    /// Refill the internal buffer from the source. Must only be called with
    /// the buffered region empty. Sets `eof` on a zero-byte read.
    fn poll_fill(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<usize>> {
        debug_assert!(self.pos == self.filled);
        self.pos = 0;
        self.filled = 0;
        let mut rb = ReadBuf::new(&mut self.buf);
        ready!(Pin::new(&mut self.inner).poll_read(cx, &mut rb))?;
        let n = rb.filled().len();
        if n == 0 {
            self.eof = true;
        }
        self.filled = n;
        Poll::Ready(Ok(n))
    }

    /// Poll-level `read_line`: resumable across `Pending`, the partial line
    /// stays in `line_buf`.
    pub fn poll_read_line(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<Option<String>>> {
        loop {
            if self.scan_line() {
                return Poll::Ready(Ok(Some(self.take_line())));
            }
            if self.eof {
                return Poll::Ready(Ok(self.line_at_eof()));
            }
            ready!(self.poll_fill(cx))?;
        }
    }

    /// Poll-level raw read: drains buffered bytes first, then reads the
    /// source directly into the caller's buffer.
    pub fn poll_read_raw(
        &mut self,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let buffered = self.buffered();
        if !buffered.is_empty() {
            let n = buffered.len().min(out.remaining());
            out.put_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            return Poll::Ready(Ok(()));
        }
        if self.eof || out.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }
        let before = out.filled().len();
        ready!(Pin::new(&mut self.inner).poll_read(cx, out))?;
        if out.filled().len() == before {
            self.eof = true;
        }
        Poll::Ready(Ok(()))
    }

    /// Read the next CRLF-terminated line. Returns `None` at end-of-stream; a
    /// final line without a trailing terminator is still returned in full.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        std::future::poll_fn(|cx| self.poll_read_line(cx)).await
    }

    /// Read raw bytes: buffered leftovers (including bytes past the last
    /// terminator a `read_line` call left behind) are drained first, then the
    /// remainder comes straight from the source. Returns 0 only at
    /// end-of-stream.
    pub async fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let mut n = {
            let buffered = self.buffered();
            let n = buffered.len().min(out.len());
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            n
        };
        if n < out.len() && !self.eof {
            let more = std::future::poll_fn(|cx| {
                let mut rb = ReadBuf::new(&mut out[n..]);
                ready!(Pin::new(&mut self.inner).poll_read(cx, &mut rb))?;
                Poll::Ready(Ok::<usize, io::Error>(rb.filled().len()))
            })
            .await?;
            if more == 0 {
                self.eof = true;
            }
            n += more;
        }
        Ok(n)
    }
}

impl<S: io::Read> LineReader<S> {
    /// Blocking refill; same contract as `poll_fill`.
    fn fill_blocking(&mut self) -> io::Result<usize> {
        debug_assert!(self.pos == self.filled);
        self.pos = 0;
        self.filled = 0;
        let n = self.inner.read(&mut self.buf)?;
        if n == 0 {
            self.eof = true;
        }
        self.filled = n;
        Ok(n)
    }

    /// Blocking twin of `read_line`.
    pub fn read_line_blocking(&mut self) -> io::Result<Option<String>> {
        loop {
            if self.scan_line() {
                return Ok(Some(self.take_line()));
            }
            if self.eof {
                return Ok(self.line_at_eof());
            }
            self.fill_blocking()?;
        }
    }

    /// Blocking twin of `read`.
    pub fn read_blocking(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let buffered = self.buffered();
        let mut n = buffered.len().min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        if n < out.len() && !self.eof {
            let more = self.inner.read(&mut out[n..])?;
            if more == 0 {
                self.eof = true;
            }
            n += more;
        }
        Ok(n)
    }
}

/// The reader is itself a readable stream: after header parsing the same
/// instance becomes the source for the body wrappers, with any buffered
/// remainder served first.
impl<S: AsyncRead + Unpin> AsyncRead for LineReader<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.poll_read_raw(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn lines_then_raw_resumes_in_place() {
        let input: &[u8] = b"alpha\r\nbeta\r\nrest-of-stream";
        let mut r = LineReader::new(input);
        assert_eq!(r.read_line().await.unwrap().as_deref(), Some("alpha"));
        assert_eq!(r.read_line().await.unwrap().as_deref(), Some("beta"));
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"rest-of-stream");
    }

    #[tokio::test]
    async fn all_buffer_sizes_agree_with_direct_read() {
        let input: &[u8] = b"first line\r\nsecond\r\n\r\ntrailing bytes without terminator";
        for cap in 1..=64usize {
            let mut r = LineReader::with_capacity(input, cap);
            let mut collected = Vec::new();
            assert_eq!(r.read_line().await.unwrap().as_deref(), Some("first line"));
            collected.extend_from_slice(b"first line\r\n");
            assert_eq!(r.read_line().await.unwrap().as_deref(), Some("second"));
            collected.extend_from_slice(b"second\r\n");
            assert_eq!(r.read_line().await.unwrap().as_deref(), Some(""));
            collected.extend_from_slice(b"\r\n");
            let mut rest = Vec::new();
            r.read_to_end(&mut rest).await.unwrap();
            collected.extend_from_slice(&rest);
            assert_eq!(collected, input, "capacity {}", cap);
        }
    }

    #[tokio::test]
    async fn empty_source_is_end_of_stream_not_error() {
        let input: &[u8] = b"";
        let mut r = LineReader::new(input);
        assert_eq!(r.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn final_line_without_terminator_returned_in_full() {
        let input: &[u8] = b"no terminator here";
        let mut r = LineReader::with_capacity(input, 3);
        assert_eq!(
            r.read_line().await.unwrap().as_deref(),
            Some("no terminator here")
        );
        assert_eq!(r.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn preserve_line_endings_keeps_crlf() {
        let input: &[u8] = b"a\r\nb";
        let mut r = LineReader::with_capacity(input, 1).preserve_line_endings(true);
        assert_eq!(r.read_line().await.unwrap().as_deref(), Some("a\r\n"));
        assert_eq!(r.read_line().await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn bare_cr_is_not_a_terminator() {
        let input: &[u8] = b"a\rb\r\nc";
        for cap in 1..=8usize {
            let mut r = LineReader::with_capacity(input, cap);
            assert_eq!(r.read_line().await.unwrap().as_deref(), Some("a\rb"));
            let mut rest = Vec::new();
            r.read_to_end(&mut rest).await.unwrap();
            assert_eq!(rest, b"c");
        }
    }

    #[test]
    fn blocking_twin_matches_async_semantics() {
        let input: &[u8] = b"one\r\ntwo\r\nleft";
        let mut r = LineReader::with_capacity(input, 2);
        assert_eq!(r.read_line_blocking().unwrap().as_deref(), Some("one"));
        assert_eq!(r.read_line_blocking().unwrap().as_deref(), Some("two"));
        let mut out = [0u8; 16];
        let n = r.read_blocking(&mut out).unwrap();
        assert_eq!(&out[..n], b"left");
        assert_eq!(r.read_blocking(&mut out).unwrap(), 0);
    }
}
