/*
 * engine.rs
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

//! HTTP/1.1 engine: exactly one request/response exchange over an
//! already-open byte stream. Serializes the request, parses the status line
//! and headers, and hands back a response whose body stream is framed by
//! Content-Length or chunked decoding.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::error::HttpError;
use crate::message::{
    classify, Body, HeaderGroup, HeaderMap, HttpVersion, Method, Request, Response,
};
use crate::net::{tls_handshake, MaybeTlsStream};
use crate::stream::{BoundedReader, ChunkedReader, LineReader};

/// Await `fut`, surfacing the caller's deadline as a cancellation failure.
/// Applied at every engine suspension point (TLS handshake, write, response
/// read).
async fn with_deadline<T, F>(deadline: Option<Instant>, fut: F) -> Result<T, HttpError>
where
    F: Future<Output = io::Result<T>>,
{
    match deadline {
        Some(d) => match tokio::time::timeout_at(d, fut).await {
            Ok(r) => r.map_err(HttpError::from),
            Err(_) => Err(HttpError::Cancelled),
        },
        None => fut.await.map_err(HttpError::from),
    }
}

/// Reject unsupported scheme or protocol version. Runs before any network
/// I/O: the transport handler calls it before dialing, the engine before
/// writing to a supplied socket.
pub fn validate(request: &Request) -> Result<(), HttpError> {
    let scheme = request.url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(HttpError::Unsupported(format!(
            "scheme {:?} (only http and https)",
            scheme
        )));
    }
    if request.version != HttpVersion::Http1_1 {
        return Err(HttpError::Unsupported(format!(
            "version {} (only HTTP/1.1)",
            request.version.as_str()
        )));
    }
    Ok(())
}

/// Perform one exchange over `socket`. The socket is consumed; the response
/// body stream owns it for as long as body bytes remain to be read.
///
/// Scheme and version are validated before any network I/O. For https the
/// stream is wrapped in TLS first, authenticating the server under the
/// request's host name.
pub async fn execute<S>(
    request: &Request,
    socket: S,
    deadline: Option<Instant>,
) -> Result<Response, HttpError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    validate(request)?;
    let Some(host) = request.url.host_str().map(str::to_string) else {
        return Err(HttpError::Configuration(
            "request URL has no host".to_string(),
        ));
    };

    let stream = if request.url.scheme() == "https" {
        let tls = with_deadline(deadline, tls_handshake(socket, &host)).await?;
        MaybeTlsStream::Tls(tls)
    } else {
        MaybeTlsStream::Plain(socket)
    };

    let mut stream = stream;
    let head = serialize_request(request);
    tracing::debug!(
        method = request.method.as_str(),
        url = %request.url,
        "sending request"
    );
    with_deadline(deadline, async {
        stream.write_all(&head).await?;
        if let Some(body) = &request.body {
            stream.write_all(&body.data).await?;
        }
        stream.flush().await
    })
    .await?;

    let mut reader = LineReader::new(stream);
    let (status, reason) = with_deadline(deadline, parse_status_line(&mut reader)).await?;
    let (headers, content_headers) =
        with_deadline(deadline, parse_headers(&mut reader)).await?;
    tracing::debug!(status, "response headers received");

    let body = frame_body(request.method, &headers, content_headers, reader)?;
    Ok(Response {
        status,
        reason,
        version: HttpVersion::Http1_1,
        headers,
        body,
        request: None,
    })
}

/// Request line, synthesized Host when absent, message headers in insertion
/// order, then the buffered body's computed Content-Length and content
/// headers, a blank line, and the body bytes are appended by the caller.
fn serialize_request(request: &Request) -> Vec<u8> {
    let mut head = Vec::with_capacity(256);
    head.extend_from_slice(request.method.as_str().as_bytes());
    head.push(b' ');
    head.extend_from_slice(request.request_target().as_bytes());
    head.extend_from_slice(b" HTTP/1.1\r\n");
    if !request.headers.contains("host") {
        if let Some(host) = request.host_header() {
            head.extend_from_slice(b"Host: ");
            head.extend_from_slice(host.as_bytes());
            head.extend_from_slice(b"\r\n");
        }
    }
    for (name, value) in request.headers.iter() {
        head.extend_from_slice(name.as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    if let Some(body) = &request.body {
        head.extend_from_slice(format!("Content-Length: {}\r\n", body.data.len()).as_bytes());
        for (name, value) in body.headers.iter() {
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            head.extend_from_slice(name.as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }
    }
    head.extend_from_slice(b"\r\n");
    head
}

/// Split the status line into exactly 3 tokens; the protocol token must be
/// HTTP/1.1.
async fn parse_status_line<S: AsyncRead + Unpin>(
    reader: &mut LineReader<S>,
) -> io::Result<(u16, String)> {
    let line = reader
        .read_line()
        .await?
        .ok_or_else(|| malformed("connection closed before status line"))?;
    let mut tokens = line.splitn(3, ' ');
    let (Some(protocol), Some(code), Some(reason)) =
        (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(malformed(format!("status line {:?}", line)));
    };
    if protocol != "HTTP/1.1" {
        return Err(malformed(format!("protocol token {:?}", protocol)));
    }
    let status: u16 = code
        .parse()
        .map_err(|_| malformed(format!("status code {:?}", code)))?;
    Ok((status, reason.to_string()))
}

/// Read header lines until the blank line, routing each to the message
/// header set or the content header set by header-group classification. A
/// single leading space after the colon is trimmed.
async fn parse_headers<S: AsyncRead + Unpin>(
    reader: &mut LineReader<S>,
) -> io::Result<(HeaderMap, HeaderMap)> {
    let mut headers = HeaderMap::new();
    let mut content_headers = HeaderMap::new();
    loop {
        let line = reader
            .read_line()
            .await?
            .ok_or_else(|| malformed("connection closed in headers"))?;
        if line.is_empty() {
            return Ok((headers, content_headers));
        }
        let Some(colon) = line.find(':') else {
            continue;
        };
        let name = &line[..colon];
        let value = &line[colon + 1..];
        let value = value.strip_prefix(' ').unwrap_or(value);
        if classify(name) == HeaderGroup::Content {
            content_headers.push(name, value);
        } else {
            headers.push(name, value);
        }
    }
}

/// Decide body framing: HEAD reads nothing and releases the reader; chunked
/// wraps the remainder in the chunk decoder; a Content-Length wraps it in an
/// exact bounded stream; otherwise there is no body. Collected content
/// headers are re-attached to whichever wrapper was produced.
fn frame_body<S>(
    method: Method,
    headers: &HeaderMap,
    content_headers: HeaderMap,
    reader: LineReader<MaybeTlsStream<S>>,
) -> Result<Option<Body>, HttpError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    if method == Method::Head {
        return Ok(None);
    }
    let chunked = headers
        .get_all("transfer-encoding")
        .any(|v| v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        let stream = ChunkedReader::new(reader);
        return Ok(Some(Body::new(Box::new(stream), content_headers)));
    }
    if let Some(cl) = content_headers.get("content-length") {
        let length: u64 = cl
            .trim()
            .parse()
            .map_err(|_| HttpError::Malformed(format!("content length {:?}", cl)))?;
        let stream = BoundedReader::new_exact(reader, length);
        return Ok(Some(Body::new(Box::new(stream), content_headers)));
    }
    Ok(None)
}

fn malformed(msg: impl Into<String>) -> io::Error {
    HttpError::Malformed(msg.into()).into_io()
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn request(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn rejects_unsupported_scheme_before_io() {
        let (client, _server) = tokio::io::duplex(64);
        let err = execute(&request("ftp://example.com/"), client, None)
            .await
            .unwrap_err();
        match err {
            HttpError::Unsupported(m) => assert!(m.contains("ftp")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejects_non_http11_version_before_io() {
        let (client, _server) = tokio::io::duplex(64);
        let mut req = request("http://example.com/");
        req.version = HttpVersion::Http1_0;
        let err = execute(&req, client, None).await.unwrap_err();
        match err {
            HttpError::Unsupported(m) => assert!(m.contains("HTTP/1.0")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn serialization_synthesizes_host_and_content_length() {
        let mut req = request("http://example.com:8080/things?q=1");
        req.method = Method::Post;
        req.headers.push("Accept", "*/*");
        req.body = Some(crate::message::RequestBody::with_content_type(
            b"hello".to_vec(),
            "text/plain",
        ));
        let head = String::from_utf8(serialize_request(&req)).unwrap();
        assert!(head.starts_with("POST /things?q=1 HTTP/1.1\r\n"));
        assert!(head.contains("Host: example.com:8080\r\n"));
        assert!(head.contains("Accept: */*\r\n"));
        assert!(head.contains("Content-Length: 5\r\n"));
        assert!(head.contains("Content-Type: text/plain\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn explicit_host_header_is_not_duplicated() {
        let mut req = request("http://example.com/");
        req.headers.push("Host", "override.example");
        let head = String::from_utf8(serialize_request(&req)).unwrap();
        assert_eq!(head.matches("Host").count(), 1);
        assert!(head.contains("Host: override.example\r\n"));
    }
}
