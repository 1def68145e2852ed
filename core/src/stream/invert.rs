/*
 * invert.rs
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

//! Write-to-read inversion: compression codecs expose a "write input, output
//! accumulates" interface; this decorator replays one as a pull-style
//! readable stream. Each refill clears the scratch buffer and resets its
//! cursor, pulls a chunk from the source, and runs it through the codec's
//! write side; at source exhaustion the write side is closed exactly once and
//! the remaining scratch bytes are served out.

use std::io::{self, Write};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use flate2::write;
use flate2::Compression;
use tokio::io::{AsyncRead, ReadBuf};

const PULL_CHUNK: usize = 4096;

/// Write-oriented byte transform: input goes in via `write`, transformed
/// output is appended to `out`. `finish` closes the write side and flushes
/// any final bytes; it is called at most once.
pub trait WriteCodec: Send {
    fn write(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()>;
    fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()>;
}

/// flate2 write-side codecs over a `Vec<u8>` sink share this surface.
trait FinishingWriter: Write + Send + Sized {
    fn sink(&mut self) -> &mut Vec<u8>;
    fn finish_into(self) -> io::Result<Vec<u8>>;
}

macro_rules! finishing_writer {
    ($ty:ty) => {
        impl FinishingWriter for $ty {
            fn sink(&mut self) -> &mut Vec<u8> {
                self.get_mut()
            }
            fn finish_into(self) -> io::Result<Vec<u8>> {
                self.finish()
            }
        }
    };
}

finishing_writer!(write::GzEncoder<Vec<u8>>);
finishing_writer!(write::GzDecoder<Vec<u8>>);
finishing_writer!(write::ZlibEncoder<Vec<u8>>);
finishing_writer!(write::ZlibDecoder<Vec<u8>>);
finishing_writer!(write::DeflateEncoder<Vec<u8>>);
finishing_writer!(write::DeflateDecoder<Vec<u8>>);

/// Adapts any finishing writer into a `WriteCodec`. `None` after finish.
struct CodecWriter<F: FinishingWriter> {
    inner: Option<F>,
}

impl<F: FinishingWriter> CodecWriter<F> {
    fn new(inner: F) -> Self {
        Self { inner: Some(inner) }
    }
}

impl<F: FinishingWriter> WriteCodec for CodecWriter<F> {
    fn write(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        let Some(w) = self.inner.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "codec write side already closed",
            ));
        };
        w.write_all(input)?;
        out.append(w.sink());
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        let Some(w) = self.inner.take() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "codec write side already closed",
            ));
        };
        let rest = w.finish_into()?;
        out.extend_from_slice(&rest);
        Ok(())
    }
}

macro_rules! codec {
    ($(#[$doc:meta])* $name:ident, $writer:ty, $make:expr) => {
        $(#[$doc])*
        pub struct $name(CodecWriter<$writer>);

        impl $name {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(CodecWriter::new($make))
            }
        }

        impl WriteCodec for $name {
            fn write(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
                self.0.write(input, out)
            }
            fn finish(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
                self.0.finish(out)
            }
        }
    };
}

codec!(
    /// RFC 1952 gzip compressor.
    GzipEncoder,
    write::GzEncoder<Vec<u8>>,
    write::GzEncoder::new(Vec::new(), Compression::default())
);
codec!(
    /// RFC 1952 gzip decompressor.
    GzipDecoder,
    write::GzDecoder<Vec<u8>>,
    write::GzDecoder::new(Vec::new())
);
codec!(
    /// RFC 1950 zlib-wrapped deflate compressor.
    ZlibEncoder,
    write::ZlibEncoder<Vec<u8>>,
    write::ZlibEncoder::new(Vec::new(), Compression::default())
);
codec!(
    /// RFC 1950 zlib-wrapped deflate decompressor.
    ZlibDecoder,
    write::ZlibDecoder<Vec<u8>>,
    write::ZlibDecoder::new(Vec::new())
);
codec!(
    /// RFC 1951 raw deflate compressor.
    DeflateEncoder,
    write::DeflateEncoder<Vec<u8>>,
    write::DeflateEncoder::new(Vec::new(), Compression::default())
);
codec!(
    /// RFC 1951 raw deflate decompressor.
    DeflateDecoder,
    write::DeflateDecoder<Vec<u8>>,
    write::DeflateDecoder::new(Vec::new())
);

/// Pull-style readable view over a write-oriented codec fed from `source`.
pub struct InvertedReader<R, C> {
    source: R,
    codec: C,
    /// Transformed bytes awaiting delivery.
    scratch: Vec<u8>,
    cursor: usize,
    /// Pull buffer for source chunks.
    chunk: Box<[u8]>,
    /// Write side closed; scratch holds the final bytes.
    finished: bool,
}

impl<R, C: WriteCodec> InvertedReader<R, C> {
    pub fn new(source: R, codec: C) -> Self {
        Self {
            source,
            codec,
            scratch: Vec::new(),
            cursor: 0,
            chunk: vec![0u8; PULL_CHUNK].into_boxed_slice(),
            finished: false,
        }
    }
}

impl<R: AsyncRead + Unpin, C: WriteCodec + Unpin> AsyncRead for InvertedReader<R, C> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        loop {
            if me.cursor < me.scratch.len() {
                let n = (me.scratch.len() - me.cursor).min(buf.remaining());
                buf.put_slice(&me.scratch[me.cursor..me.cursor + n]);
                me.cursor += n;
                return Poll::Ready(Ok(()));
            }
            if me.finished {
                return Poll::Ready(Ok(()));
            }
            // Refill: scratch is cleared and the cursor reset before any new
            // codec output lands, so stale bytes can never be re-served.
            me.scratch.clear();
            me.cursor = 0;
            let mut rb = ReadBuf::new(&mut me.chunk);
            ready!(Pin::new(&mut me.source).poll_read(cx, &mut rb))?;
            let filled = rb.filled().len();
            if filled == 0 {
                me.codec.finish(&mut me.scratch)?;
                me.finished = true;
            } else {
                let input = &me.chunk[..filled];
                me.codec.write(input, &mut me.scratch)?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn drain<R: AsyncRead + Unpin>(mut r: R) -> Vec<u8> {
        let mut out = Vec::new();
        r.read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn gzip_round_trip_through_inversion() {
        let plain = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let compressed = drain(InvertedReader::new(&plain[..], GzipEncoder::new())).await;
        assert_ne!(compressed, plain);
        let decoded = drain(InvertedReader::new(&compressed[..], GzipDecoder::new())).await;
        assert_eq!(decoded, plain);
    }

    #[tokio::test]
    async fn zlib_and_raw_deflate_round_trips() {
        let plain = b"stream inversion keeps every byte".to_vec();
        let z = drain(InvertedReader::new(&plain[..], ZlibEncoder::new())).await;
        assert_eq!(
            drain(InvertedReader::new(&z[..], ZlibDecoder::new())).await,
            plain
        );
        let d = drain(InvertedReader::new(&plain[..], DeflateEncoder::new())).await;
        assert_eq!(
            drain(InvertedReader::new(&d[..], DeflateDecoder::new())).await,
            plain
        );
    }

    #[tokio::test]
    async fn empty_source_still_closes_codec_once() {
        let empty: &[u8] = b"";
        let compressed = drain(InvertedReader::new(empty, GzipEncoder::new())).await;
        // A gzip stream of nothing still has its header and trailer.
        assert!(!compressed.is_empty());
        let decoded = drain(InvertedReader::new(&compressed[..], GzipDecoder::new())).await;
        assert!(decoded.is_empty());
    }

    #[tokio::test]
    async fn reports_zero_forever_after_exhaustion() {
        let plain: &[u8] = b"x";
        let mut r = InvertedReader::new(plain, GzipEncoder::new());
        let mut all = Vec::new();
        r.read_to_end(&mut all).await.unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(r.read(&mut buf).await.unwrap(), 0);
        assert_eq!(r.read(&mut buf).await.unwrap(), 0);
    }
}
