/*
 * lib.rs
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

//! Telaio core: a client-side HTTP/1.1 implementation that speaks the wire
//! protocol directly over a TCP or TLS socket.
//!
//! Design:
//! - Callers control connection establishment: supply a pre-connected socket
//!   (e.g. tunneled through a proxy), a socket factory, or let the TCP
//!   connector dial. TLS (rustls) is negotiated by the engine when the
//!   request scheme asks for it.
//! - Bodies are streams: the engine frames the response body with a bounded
//!   reader (Content-Length) or the chunk decoder, over the same buffered
//!   reader that parsed the head.
//! - Cross-cutting behavior is middleware: redirect following,
//!   decompression, cookies, and exchange logging each wrap an inner handler
//!   with a uniform observe/forward/transform contract.
//! - One flow per exchange; the cookie jar is the only state shared across
//!   exchanges and serializes access internally.

pub mod client;
pub mod cookies;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod handler;
pub mod message;
pub mod net;
pub mod stream;

pub use client::{Client, ClientConfig};
pub use error::HttpError;
pub use message::{Body, HeaderMap, HttpVersion, Method, Request, RequestBody, Response};
