/*
 * response.rs
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

//! HTTP response: status, headers, optional streaming body, and a reference
//! to the request that produced it (the per-hop request across redirects).

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::message::headers::HeaderMap;
use crate::message::request::{HttpVersion, Request};

/// Boxed readable byte stream; every body wrapper produced by the engine or
/// the decompressor erases to this.
pub type BodyStream = Box<dyn AsyncRead + Send + Unpin>;

/// Response body: an opaque readable stream with its content headers
/// (Content-Type, Content-Length, Content-Encoding, ...) attached.
pub struct Body {
    pub headers: HeaderMap,
    stream: BodyStream,
}

impl Body {
    pub fn new(stream: BodyStream, headers: HeaderMap) -> Self {
        Self { headers, stream }
    }

    pub fn into_parts(self) -> (HeaderMap, BodyStream) {
        (self.headers, self.stream)
    }

    /// Drain the stream fully into memory.
    pub async fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.stream.read_to_end(&mut out).await?;
        Ok(out)
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body").field("headers", &self.headers).finish_non_exhaustive()
    }
}

/// HTTP response as produced by the engine and transformed by middleware.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub version: HttpVersion,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    /// The request this response answers. Set by the transport handler; the
    /// redirect and cookie middleware require it (a missing reference is a
    /// configuration error for the redirect follower).
    pub request: Option<Arc<Request>>,
}

impl Response {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            version: HttpVersion::Http1_1,
            headers: HeaderMap::new(),
            body: None,
            request: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Head-only snapshot for redirect history entries.
    pub fn record(&self) -> ResponseRecord {
        ResponseRecord {
            status: self.status,
            reason: self.reason.clone(),
            version: self.version,
            headers: self.headers.clone(),
        }
    }
}

/// Status line and headers of a response, without the body stream.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub status: u16,
    pub reason: String,
    pub version: HttpVersion,
    pub headers: HeaderMap,
}

/// One hop of a followed redirect chain: the request sent and the response
/// head it received. The terminal exchange gets an entry too.
#[derive(Debug, Clone)]
pub struct RedirectHistoryEntry {
    pub request: Arc<Request>,
    pub response: ResponseRecord,
}
