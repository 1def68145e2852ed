/*
 * redirect.rs
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

//! Redirect follower: re-issues the request while the response status and
//! Location header call for it, rewriting method and body per status, and
//! optionally recording a (request, response) entry per hop.

use url::Url;

use crate::error::HttpError;
use crate::handler::{ExchangeContext, HandlerFuture, MessageHandler};
use crate::message::{Method, RedirectHistoryEntry, Request, RequestBody, Response};

/// Redirect behavior knobs.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    pub auto_redirect: bool,
    pub max_redirects: u32,
    pub track_history: bool,
    /// Walk the inner chain at construction and disable redirect following on
    /// anything below, so redirects are followed once, at this layer.
    pub disable_nested: bool,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            auto_redirect: true,
            max_redirects: 20,
            track_history: false,
            disable_nested: true,
        }
    }
}

pub struct RedirectFollower {
    inner: Box<dyn MessageHandler>,
    policy: RedirectPolicy,
}

impl RedirectFollower {
    pub fn new(mut inner: Box<dyn MessageHandler>, policy: RedirectPolicy) -> Self {
        if policy.disable_nested {
            let mut handler: Option<&mut dyn MessageHandler> = Some(inner.as_mut());
            while let Some(h) = handler.take() {
                h.set_follow_redirects(false);
                handler = h.inner_handler();
            }
        }
        Self { inner, policy }
    }
}

fn is_redirect_status(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Exactly one non-blank Location header, or no target.
fn redirect_location(response: &Response) -> Option<String> {
    let mut values = response
        .headers
        .get_all("location")
        .filter(|v| !v.trim().is_empty());
    let first = values.next()?;
    if values.next().is_some() {
        return None;
    }
    Some(first.to_string())
}

/// Resolve the redirect target: a `//` prefix inherits the previous scheme; a
/// leading `/` or a value that fails absolute parsing resolves relative to
/// the previous URL.
fn resolve_location(previous: &Url, location: &str) -> Result<Url, HttpError> {
    let resolved = if let Some(rest) = location.strip_prefix("//") {
        Url::parse(&format!("{}://{}", previous.scheme(), rest))
    } else if location.starts_with('/') {
        previous.join(location)
    } else {
        Url::parse(location).or_else(|_| previous.join(location))
    };
    resolved.map_err(|_| HttpError::Malformed(format!("redirect location {:?}", location)))
}

/// Method and body rewrite per status: 301 on POST, and 302/303 on anything
/// but HEAD, become GET without a body. Everything else keeps its method, and
/// keeps the buffered body only for 307/308.
fn rewrite(status: u16, method: Method, body: Option<RequestBody>) -> (Method, Option<RequestBody>) {
    let to_get = (status == 301 && method == Method::Post)
        || ((status == 302 || status == 303) && method != Method::Head);
    if to_get {
        return (Method::Get, None);
    }
    if status == 307 || status == 308 {
        (method, body)
    } else {
        (method, None)
    }
}

impl MessageHandler for RedirectFollower {
    fn send<'a>(&'a self, request: Request, ctx: &'a mut ExchangeContext) -> HandlerFuture<'a> {
        Box::pin(async move {
            if !self.policy.auto_redirect {
                return self.inner.send(request, ctx).await;
            }
            // Buffer the original body and copy the header set so per-hop
            // requests never mutate shared state.
            let original_headers = request.headers.clone();
            let original_body = request.body.clone();
            let version = request.version;
            let mut history = if self.policy.track_history {
                Some(Vec::new())
            } else {
                None
            };

            let mut current = request;
            let mut hops = 0u32;
            loop {
                let response = self.inner.send(current, ctx).await?;
                let Some(hop_request) = response.request.clone() else {
                    return Err(HttpError::Configuration(
                        "inner handler returned a response with no associated request"
                            .to_string(),
                    ));
                };

                let location = if hops < self.policy.max_redirects
                    && is_redirect_status(response.status)
                {
                    redirect_location(&response)
                } else {
                    None
                };
                let Some(location) = location else {
                    // Terminal exchange: record it and attach the full hop
                    // list when history tracking is on.
                    if let Some(mut entries) = history.take() {
                        entries.push(RedirectHistoryEntry {
                            request: hop_request,
                            response: response.record(),
                        });
                        ctx.redirect_history = Some(entries);
                    }
                    return Ok(response);
                };

                let status = response.status;
                if let Some(entries) = history.as_mut() {
                    entries.push(RedirectHistoryEntry {
                        request: hop_request.clone(),
                        response: response.record(),
                    });
                }
                drop(response);

                let next_url = resolve_location(&hop_request.url, &location)?;
                let (method, body) = rewrite(status, hop_request.method, original_body.clone());
                tracing::debug!(
                    status,
                    location = %next_url,
                    hop = hops + 1,
                    "following redirect"
                );
                current = Request {
                    method,
                    url: next_url,
                    version,
                    headers: original_headers.clone(),
                    body,
                };
                hops += 1;
            }
        })
    }

    fn inner_handler(&mut self) -> Option<&mut dyn MessageHandler> {
        Some(self.inner.as_mut())
    }

    fn set_follow_redirects(&mut self, enabled: bool) {
        self.policy.auto_redirect = enabled;
    }
}
