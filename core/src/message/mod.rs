/*
 * mod.rs
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

//! HTTP message model: requests, responses, bodies, and the ordered header
//! multimap with its header-group classification.

mod headers;
mod request;
mod response;

pub use headers::{classify, HeaderGroup, HeaderMap};
pub use request::{HttpVersion, Method, Request, RequestBody};
pub use response::{Body, BodyStream, RedirectHistoryEntry, Response, ResponseRecord};
