/*
 * decompress.rs
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

//! Content decompression: advertises gzip/deflate, sniffs the first two body
//! bytes to disambiguate zlib-wrapped from raw deflate, and replaces the
//! body with the decoding stream.
//!
//! "deflate" on the wire is ambiguous in practice between RFC 1950
//! (zlib-wrapped) and RFC 1951 (raw) streams, hence the dual handling.

use std::io::Cursor;

use tokio::io::AsyncReadExt;

use crate::handler::{ExchangeContext, HandlerFuture, MessageHandler};
use crate::message::{Body, BodyStream, HeaderMap, Request};
use crate::stream::{ConcatReader, DeflateDecoder, GzipDecoder, InvertedReader, ZlibDecoder};

/// Zlib stream header: CMF 0x78 (deflate, 32K window) and one of the four
/// FCHECK-valid FLG bytes.
const ZLIB_CMF: u8 = 0x78;
const ZLIB_FLG: [u8; 4] = [0x01, 0x5E, 0x9C, 0xDA];

fn is_zlib_header(sniff: &[u8]) -> bool {
    sniff.len() == 2 && sniff[0] == ZLIB_CMF && ZLIB_FLG.contains(&sniff[1])
}

pub struct Decompressor {
    inner: Box<dyn MessageHandler>,
    gzip: bool,
    deflate: bool,
}

impl Decompressor {
    pub fn new(inner: Box<dyn MessageHandler>) -> Self {
        Self {
            inner,
            gzip: true,
            deflate: true,
        }
    }

    pub fn encodings(mut self, gzip: bool, deflate: bool) -> Self {
        self.gzip = gzip;
        self.deflate = deflate;
        self
    }

    /// Add enabled encodings to Accept-Encoding, skipping any the request
    /// already advertises.
    fn advertise(&self, request: &mut Request) {
        let existing = request
            .headers
            .get_all("accept-encoding")
            .collect::<Vec<_>>()
            .join(", ");
        let mut wanted = Vec::new();
        for (enabled, name) in [(self.gzip, "gzip"), (self.deflate, "deflate")] {
            if enabled && !existing.to_ascii_lowercase().contains(name) {
                wanted.push(name);
            }
        }
        if wanted.is_empty() {
            return;
        }
        if existing.is_empty() {
            request.headers.push("Accept-Encoding", wanted.join(", "));
        } else {
            request
                .headers
                .set("Accept-Encoding", format!("{}, {}", existing, wanted.join(", ")));
        }
    }
}

/// Re-assemble the body so the sniffed prefix is not lost: the two peeked
/// bytes become their own source ahead of the remaining network stream.
fn reassemble(sniff: &[u8], rest: BodyStream) -> BodyStream {
    Box::new(
        ConcatReader::new(vec![Box::new(Cursor::new(sniff.to_vec())), rest])
            .dispose_on_completion(true),
    )
}

impl MessageHandler for Decompressor {
    fn send<'a>(&'a self, mut request: Request, ctx: &'a mut ExchangeContext) -> HandlerFuture<'a> {
        Box::pin(async move {
            self.advertise(&mut request);
            let mut response = self.inner.send(request, ctx).await?;

            let Some(body) = response.body.take() else {
                return Ok(response);
            };
            if !body.headers.contains("content-encoding") {
                response.body = Some(body);
                return Ok(response);
            }
            let (headers, mut stream) = body.into_parts();
            let encoding = headers
                .get("content-encoding")
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();

            // Peek exactly the first two bytes for framing detection.
            let mut sniff = [0u8; 2];
            let mut got = 0usize;
            while got < 2 {
                let n = stream.read(&mut sniff[got..]).await?;
                if n == 0 {
                    break;
                }
                got += n;
            }
            let sniff = &sniff[..got];

            #[derive(Clone, Copy)]
            enum Codec {
                Gzip,
                Zlib,
                Deflate,
                PassThrough,
            }
            let codec = match encoding.as_str() {
                "gzip" | "x-gzip" if self.gzip => Codec::Gzip,
                "deflate" if self.deflate => {
                    if is_zlib_header(sniff) {
                        tracing::trace!("deflate body carries a zlib header");
                        Codec::Zlib
                    } else {
                        Codec::Deflate
                    }
                }
                _ => Codec::PassThrough,
            };
            let reassembled = reassemble(sniff, stream);
            let (new_stream, decoded): (BodyStream, bool) = match codec {
                Codec::Gzip => (
                    Box::new(InvertedReader::new(reassembled, GzipDecoder::new())),
                    true,
                ),
                Codec::Zlib => (
                    Box::new(InvertedReader::new(reassembled, ZlibDecoder::new())),
                    true,
                ),
                Codec::Deflate => (
                    Box::new(InvertedReader::new(reassembled, DeflateDecoder::new())),
                    true,
                ),
                // Unknown or disabled encoding: body passes through with the
                // sniffed bytes restored and headers untouched.
                Codec::PassThrough => (reassembled, false),
            };

            if decoded {
                // Every content header except Content-Encoding moves to the
                // new body's header set.
                let mut new_headers = HeaderMap::new();
                for (name, value) in headers.iter() {
                    if name.eq_ignore_ascii_case("content-encoding") {
                        continue;
                    }
                    new_headers.push(name, value);
                }
                response.body = Some(Body::new(new_stream, new_headers));
            } else {
                response.body = Some(Body::new(new_stream, headers));
            }
            Ok(response)
        })
    }

    fn inner_handler(&mut self) -> Option<&mut dyn MessageHandler> {
        Some(self.inner.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zlib_header_detection() {
        assert!(is_zlib_header(&[0x78, 0x9C]));
        assert!(is_zlib_header(&[0x78, 0x01]));
        assert!(is_zlib_header(&[0x78, 0x5E]));
        assert!(is_zlib_header(&[0x78, 0xDA]));
        assert!(!is_zlib_header(&[0x78, 0x02]));
        assert!(!is_zlib_header(&[0x1F, 0x8B]));
        assert!(!is_zlib_header(&[0x78]));
    }
}
