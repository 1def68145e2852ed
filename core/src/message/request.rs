/*
 * request.rs
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

//! HTTP request: method, absolute target URL, headers, optional buffered body.

use url::Url;

use crate::message::headers::HeaderMap;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Other(&'static str),
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Other(s) => s,
        }
    }
}

/// Protocol version on the wire. The engine speaks 1.1 only and rejects
/// anything else before network I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http1_0,
    Http1_1,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http1_0 => "HTTP/1.0",
            HttpVersion::Http1_1 => "HTTP/1.1",
        }
    }
}

/// Buffered request body plus its content headers (Content-Type etc.).
/// Content-Length is computed from `data` at serialization time.
#[derive(Debug, Clone, Default)]
pub struct RequestBody {
    pub data: Vec<u8>,
    pub headers: HeaderMap,
}

impl RequestBody {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_content_type(data: Vec<u8>, content_type: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.push("Content-Type", content_type);
        Self { data, headers }
    }
}

/// HTTP request. Headers keep insertion order; the body, when present, is
/// fully buffered so its length framing is known before serialization and so
/// the redirect follower can resend it.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub version: HttpVersion,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            version: HttpVersion::Http1_1,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Append a header. Name is stored as given; comparison is case-insensitive per HTTP.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(name, value);
        self
    }

    /// Set the request body (buffered).
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Request-target for the request line: path plus query, origin form.
    pub fn request_target(&self) -> String {
        let mut target = self.url.path().to_string();
        if target.is_empty() {
            target.push('/');
        }
        if let Some(q) = self.url.query() {
            target.push('?');
            target.push_str(q);
        }
        target
    }

    /// Host header value: host name, plus the port when not the scheme default.
    pub fn host_header(&self) -> Option<String> {
        let host = self.url.host_str()?;
        match self.url.port() {
            Some(port) => Some(format!("{}:{}", host, port)),
            None => Some(host.to_string()),
        }
    }
}
