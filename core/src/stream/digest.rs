/*
 * digest.rs
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

//! Digest-while-streaming: every byte passing through feeds a running
//! cryptographic digest. One instance is configured for reading or for
//! writing, never both; the finalized digest is available only after
//! end-of-data (read mode) or shutdown (write mode).

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use sha2::Digest;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestMode {
    Read,
    Write,
}

impl DigestMode {
    fn as_str(&self) -> &'static str {
        match self {
            DigestMode::Read => "read",
            DigestMode::Write => "write",
        }
    }
}

/// Wraps an inner stream in read mode or write mode. Calling the
/// non-configured operation fails with an unsupported-operation error naming
/// the configured mode.
pub struct DigestStream<S, D: Digest> {
    inner: S,
    mode: DigestMode,
    digest: Option<D>,
    finalized: Option<Vec<u8>>,
}

impl<S, D: Digest> DigestStream<S, D> {
    /// Read mode: digest is finalized when the inner stream reports 0.
    pub fn reading(inner: S) -> Self {
        Self {
            inner,
            mode: DigestMode::Read,
            digest: Some(D::new()),
            finalized: None,
        }
    }

    /// Write mode: digest is finalized on shutdown.
    pub fn writing(inner: S) -> Self {
        Self {
            inner,
            mode: DigestMode::Write,
            digest: Some(D::new()),
            finalized: None,
        }
    }

    pub fn mode(&self) -> DigestMode {
        self.mode
    }

    /// The finalized digest, or `None` while data may still pass through.
    pub fn finalized(&self) -> Option<&[u8]> {
        self.finalized.as_deref()
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn finalize(&mut self) {
        if let Some(d) = self.digest.take() {
            self.finalized = Some(d.finalize().to_vec());
        }
    }

    fn wrong_mode(&self, attempted: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            format!(
                "{} not supported: digest stream is configured for {} mode",
                attempted,
                self.mode.as_str()
            ),
        )
    }
}

impl<S: AsyncRead + Unpin, D: Digest + Unpin> AsyncRead for DigestStream<S, D> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.mode != DigestMode::Read {
            return Poll::Ready(Err(me.wrong_mode("read")));
        }
        let before = buf.filled().len();
        ready!(Pin::new(&mut me.inner).poll_read(cx, buf))?;
        let new = &buf.filled()[before..];
        if new.is_empty() {
            me.finalize();
        } else if let Some(d) = me.digest.as_mut() {
            d.update(new);
        }
        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncWrite + Unpin, D: Digest + Unpin> AsyncWrite for DigestStream<S, D> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        let me = self.get_mut();
        if me.mode != DigestMode::Write {
            return Poll::Ready(Err(me.wrong_mode("write")));
        }
        let n = ready!(Pin::new(&mut me.inner).poll_write(cx, data))?;
        if let Some(d) = me.digest.as_mut() {
            d.update(&data[..n]);
        }
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.mode != DigestMode::Write {
            return Poll::Ready(Err(me.wrong_mode("flush")));
        }
        Pin::new(&mut me.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.mode != DigestMode::Write {
            return Poll::Ready(Err(me.wrong_mode("shutdown")));
        }
        ready!(Pin::new(&mut me.inner).poll_shutdown(cx))?;
        me.finalize();
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::Sha256;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn read_mode_digest_matches_one_shot_hash() {
        let data = b"digest every byte that passes through";
        let mut s = DigestStream::<_, Sha256>::reading(&data[..]);
        let mut out = Vec::new();
        s.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, data);
        let expected = Sha256::digest(data);
        assert_eq!(s.finalized(), Some(expected.as_slice()));
    }

    #[tokio::test]
    async fn digest_unavailable_until_end_of_data() {
        let data = b"abcdef";
        let mut s = DigestStream::<_, Sha256>::reading(&data[..]);
        let mut buf = [0u8; 3];
        s.read_exact(&mut buf).await.unwrap();
        assert!(s.finalized().is_none());
        let mut rest = Vec::new();
        s.read_to_end(&mut rest).await.unwrap();
        assert!(s.finalized().is_some());
    }

    #[tokio::test]
    async fn write_mode_digest_finalizes_on_shutdown() {
        let mut s = DigestStream::<_, Sha256>::writing(Vec::new());
        s.write_all(b"hello ").await.unwrap();
        s.write_all(b"world").await.unwrap();
        assert!(s.finalized().is_none());
        s.shutdown().await.unwrap();
        let expected = Sha256::digest(b"hello world");
        assert_eq!(s.finalized(), Some(expected.as_slice()));
        assert_eq!(s.into_inner(), b"hello world");
    }

    #[tokio::test]
    async fn wrong_mode_is_an_unsupported_operation() {
        let mut s = DigestStream::<_, Sha256>::reading(std::io::Cursor::new(b"x".to_vec()));
        let err = s.write_all(b"nope").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(err.to_string().contains("read mode"));

        let mut s = DigestStream::<_, Sha256>::writing(std::io::Cursor::new(Vec::new()));
        let mut buf = [0u8; 1];
        let err = s.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(err.to_string().contains("write mode"));
    }
}
