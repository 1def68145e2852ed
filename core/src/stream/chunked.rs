/*
 * chunked.rs
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

//! Chunked transfer-encoding codec (RFC 9112 §7.1): decode an inbound
//! chunked body into a flat byte stream, encode an outbound flat stream into
//! chunk framing (`<hex-size>\r\n<data>\r\n`, terminal `0\r\n\r\n`).

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use crate::error::HttpError;
use crate::stream::line_reader::LineReader;
use crate::stream::poll_read_limited;

/// Decoder state. One instance owns it exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    AwaitingSize,
    InChunk(u64),
    /// Chunk data fully served; its trailing CRLF is consumed exactly once.
    ChunkEnd,
    AwaitingTrailer,
    Done,
}

/// Decodes a chunked body. Wraps the buffered reader so size lines and data
/// come off the same buffer the header parse left behind.
pub struct ChunkedReader<S> {
    lines: LineReader<S>,
    state: DecodeState,
}

impl<S> ChunkedReader<S> {
    pub fn new(lines: LineReader<S>) -> Self {
        Self {
            lines,
            state: DecodeState::AwaitingSize,
        }
    }
}

fn malformed(msg: impl Into<String>) -> io::Error {
    HttpError::Malformed(msg.into()).into_io()
}

impl<S: AsyncRead + Unpin> AsyncRead for ChunkedReader<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        loop {
            match me.state {
                DecodeState::AwaitingSize => {
                    let line = ready!(me.lines.poll_read_line(cx))?
                        .ok_or_else(|| malformed("end of stream before chunk size"))?;
                    let hex = line.split(';').next().unwrap_or("").trim();
                    let size = u64::from_str_radix(hex, 16)
                        .map_err(|_| malformed(format!("invalid chunk size {:?}", hex)))?;
                    me.state = if size == 0 {
                        DecodeState::AwaitingTrailer
                    } else {
                        DecodeState::InChunk(size)
                    };
                }
                DecodeState::InChunk(remaining) => {
                    if buf.remaining() == 0 {
                        return Poll::Ready(Ok(()));
                    }
                    let limit = remaining.min(buf.remaining() as u64) as usize;
                    let n = ready!(poll_read_limited(&mut me.lines, cx, buf, limit))?;
                    if n == 0 {
                        return Poll::Ready(Err(malformed("end of stream inside chunk")));
                    }
                    let left = remaining - n as u64;
                    me.state = if left == 0 {
                        DecodeState::ChunkEnd
                    } else {
                        DecodeState::InChunk(left)
                    };
                    return Poll::Ready(Ok(()));
                }
                DecodeState::ChunkEnd => {
                    let line = ready!(me.lines.poll_read_line(cx))?
                        .ok_or_else(|| malformed("end of stream after chunk data"))?;
                    if !line.is_empty() {
                        return Poll::Ready(Err(malformed("missing CRLF after chunk data")));
                    }
                    me.state = DecodeState::AwaitingSize;
                }
                DecodeState::AwaitingTrailer => {
                    let line = ready!(me.lines.poll_read_line(cx))?
                        .ok_or_else(|| malformed("end of stream in trailer section"))?;
                    // Trailer header lines are consumed and dropped; the blank
                    // line ends the message.
                    if line.is_empty() {
                        me.state = DecodeState::Done;
                    }
                }
                DecodeState::Done => return Poll::Ready(Ok(())),
            }
        }
    }
}

/// Smallest output buffer the encoder accepts: a one-digit size line, two
/// CRLFs, and at least one data byte. A chunk header cannot be split across
/// encoder outputs.
pub const MIN_CHUNK_BUFFER: usize = 6;

const ENCODE_CHUNK: usize = 8192;

/// Encodes an inner flat stream into chunk framing. Each outer read yields
/// one complete framed chunk sized to the caller's buffer; once the inner
/// stream is exhausted the terminal `0\r\n\r\n` is emitted exactly once and
/// the encoder reports 0 forever after.
pub struct ChunkedEncoder<S> {
    inner: S,
    data: Box<[u8]>,
    done: bool,
}

impl<S> ChunkedEncoder<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            data: vec![0u8; ENCODE_CHUNK].into_boxed_slice(),
            done: false,
        }
    }
}

/// Largest data payload whose full framing fits a buffer of `cap` bytes.
fn max_data_for(cap: usize) -> usize {
    let mut data = cap.saturating_sub(5);
    while hex_len(data) + 4 + data > cap {
        data -= 1;
    }
    data
}

fn hex_len(n: usize) -> usize {
    (format!("{:x}", n)).len()
}

impl<S: AsyncRead + Unpin> AsyncRead for ChunkedEncoder<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let me = self.get_mut();
        if me.done {
            return Poll::Ready(Ok(()));
        }
        let cap = buf.remaining();
        if cap < MIN_CHUNK_BUFFER {
            let err = HttpError::ChunkBufferTooSmall {
                needed: MIN_CHUNK_BUFFER,
                got: cap,
            };
            return Poll::Ready(Err(err.into_io()));
        }
        let limit = max_data_for(cap).min(me.data.len());
        let mut rb = ReadBuf::new(&mut me.data[..limit]);
        ready!(Pin::new(&mut me.inner).poll_read(cx, &mut rb))?;
        let n = rb.filled().len();
        if n == 0 {
            buf.put_slice(b"0\r\n\r\n");
            me.done = true;
            return Poll::Ready(Ok(()));
        }
        buf.put_slice(format!("{:x}\r\n", n).as_bytes());
        buf.put_slice(&me.data[..n]);
        buf.put_slice(b"\r\n");
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::poll_fn;
    use tokio::io::AsyncReadExt;

    async fn decode(wire: &'static [u8]) -> io::Result<Vec<u8>> {
        let mut r = ChunkedReader::new(LineReader::new(wire));
        let mut out = Vec::new();
        r.read_to_end(&mut out).await?;
        Ok(out)
    }

    #[tokio::test]
    async fn decodes_wikipedia_example() {
        let body = decode(b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n").await.unwrap();
        assert_eq!(body, b"Wikipedia");
    }

    #[tokio::test]
    async fn trailer_headers_are_consumed() {
        let body = decode(b"3\r\nabc\r\n0\r\nExpires: never\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(body, b"abc");
    }

    #[tokio::test]
    async fn bad_size_line_is_malformed() {
        let err = decode(b"zz\r\ndata\r\n0\r\n\r\n").await.unwrap_err();
        match HttpError::from(err) {
            HttpError::Malformed(m) => assert!(m.contains("chunk size")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn truncated_chunk_is_malformed_not_eof() {
        let err = decode(b"a\r\nonly4\r\n").await.unwrap_err();
        match HttpError::from(err) {
            HttpError::Malformed(_) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn encoder_round_trips_at_various_buffer_sizes() {
        let input: Vec<u8> = (0u8..=255).cycle().take(3000).collect();
        for outer in [MIN_CHUNK_BUFFER, 37, input.len(), input.len() * 4] {
            let mut enc = ChunkedEncoder::new(&input[..]);
            let mut wire = Vec::new();
            let mut buf = vec![0u8; outer];
            loop {
                let n = enc.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                wire.extend_from_slice(&buf[..n]);
            }
            let mut dec = ChunkedReader::new(LineReader::new(&wire[..]));
            let mut out = Vec::new();
            dec.read_to_end(&mut out).await.unwrap();
            assert_eq!(out, input, "outer buffer {}", outer);
        }
    }

    #[tokio::test]
    async fn decoder_handles_chunk_reads_of_one_byte() {
        let wire: &[u8] = b"9\r\nWikipedia\r\n0\r\n\r\n";
        let mut dec = ChunkedReader::new(LineReader::with_capacity(wire, 1));
        let mut out = Vec::new();
        let mut one = [0u8; 1];
        loop {
            let n = dec.read(&mut one).await.unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&one[..n]);
        }
        assert_eq!(out, b"Wikipedia");
    }

    #[tokio::test]
    async fn encoder_rejects_undersized_output_buffer() {
        let input: &[u8] = b"data";
        let mut enc = ChunkedEncoder::new(input);
        let err = poll_fn(|cx| {
            let mut small = [0u8; MIN_CHUNK_BUFFER - 1];
            let mut rb = ReadBuf::new(&mut small);
            Pin::new(&mut enc).poll_read(cx, &mut rb)
        })
        .await
        .unwrap_err();
        match HttpError::from(err) {
            HttpError::ChunkBufferTooSmall { needed, got } => {
                assert_eq!(needed, MIN_CHUNK_BUFFER);
                assert_eq!(got, MIN_CHUNK_BUFFER - 1);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn terminal_sequence_emitted_exactly_once() {
        let input: &[u8] = b"";
        let mut enc = ChunkedEncoder::new(input);
        let mut buf = [0u8; 16];
        let n = enc.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"0\r\n\r\n");
        assert_eq!(enc.read(&mut buf).await.unwrap(), 0);
        assert_eq!(enc.read(&mut buf).await.unwrap(), 0);
    }
}
