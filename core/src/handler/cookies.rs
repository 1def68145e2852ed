/*
 * cookies.rs
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

//! Cookie middleware: merges jar cookies into the outgoing Cookie header and
//! feeds Set-Cookie response headers back into the jar.

use std::sync::Arc;

use crate::cookies::CookieJar;
use crate::handler::{ExchangeContext, HandlerFuture, MessageHandler};
use crate::message::Request;

pub struct CookieHandler {
    inner: Box<dyn MessageHandler>,
    jar: Arc<dyn CookieJar>,
}

impl CookieHandler {
    pub fn new(inner: Box<dyn MessageHandler>, jar: Arc<dyn CookieJar>) -> Self {
        Self { inner, jar }
    }
}

impl MessageHandler for CookieHandler {
    fn send<'a>(&'a self, mut request: Request, ctx: &'a mut ExchangeContext) -> HandlerFuture<'a> {
        Box::pin(async move {
            // Manual values first, then jar values; concatenation only, no
            // semantic merge.
            let jar_value = self.jar.cookie_header_value(&request.url);
            if !jar_value.is_empty() {
                let manual = request
                    .headers
                    .get_all("cookie")
                    .collect::<Vec<_>>()
                    .join("; ");
                let combined = if manual.is_empty() {
                    jar_value
                } else {
                    format!("{}; {}", manual, jar_value)
                };
                request.headers.set("Cookie", combined);
            }

            let response = self.inner.send(request, ctx).await?;

            // Key the jar update by the response's own request URI, which
            // differs from the original across redirects.
            if let Some(hop_request) = &response.request {
                for value in response.headers.get_all("set-cookie") {
                    self.jar.set_cookies_from_header(&hop_request.url, value);
                }
            }
            Ok(response)
        })
    }

    fn inner_handler(&mut self) -> Option<&mut dyn MessageHandler> {
        Some(self.inner.as_mut())
    }
}
