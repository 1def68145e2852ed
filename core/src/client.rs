/*
 * client.rs
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

//! Client facade: assembles the default middleware stack around the
//! transport handler and offers request execution with an explicit exchange
//! context or a fresh one per call.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::cookies::{CookieJar, MemoryCookieJar};
use crate::error::HttpError;
use crate::exchange::{ExchangeSerializer, ExchangeStore};
use crate::handler::{
    CookieHandler, Decompressor, ExchangeContext, ExchangeLogger, MessageHandler,
    RedirectFollower, RedirectPolicy, TransportHandler,
};
use crate::message::{Request, Response};
use crate::net::{Connector, DEFAULT_CONNECT_TIMEOUT};

/// Assembly knobs for the default stack.
pub struct ClientConfig {
    pub redirects: RedirectPolicy,
    pub gzip: bool,
    pub deflate: bool,
    pub connect_timeout: Duration,
    pub user_agent: Option<String>,
    /// Jar shared by every exchange; defaults to a fresh in-memory jar.
    pub cookie_jar: Option<Arc<dyn CookieJar>>,
    /// When present, an exchange logger wraps the stack and records each
    /// exchange into the store.
    pub exchange_log: Option<(Arc<dyn ExchangeStore>, Arc<dyn ExchangeSerializer>)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            redirects: RedirectPolicy::default(),
            gzip: true,
            deflate: true,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: Some(format!("telaio/{}", env!("CARGO_PKG_VERSION"))),
            cookie_jar: None,
            exchange_log: None,
        }
    }
}

/// HTTP client over the assembled handler chain:
/// logger → redirect follower → cookies → decompressor → transport.
pub struct Client {
    handler: Box<dyn MessageHandler>,
    user_agent: Option<String>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let transport = TransportHandler::new(Connector::new(config.connect_timeout));
        Self::with_transport(config, Box::new(transport))
    }

    /// Build the stack over a caller-supplied terminal handler (e.g. one
    /// holding a pre-connected socket).
    pub fn with_transport(config: ClientConfig, transport: Box<dyn MessageHandler>) -> Self {
        let jar = config
            .cookie_jar
            .unwrap_or_else(|| Arc::new(MemoryCookieJar::new()));
        let mut handler: Box<dyn MessageHandler> =
            Box::new(Decompressor::new(transport).encodings(config.gzip, config.deflate));
        handler = Box::new(CookieHandler::new(handler, jar));
        handler = Box::new(RedirectFollower::new(handler, config.redirects));
        if let Some((store, serializer)) = config.exchange_log {
            handler = Box::new(ExchangeLogger::new(handler, store, serializer));
        }
        Self {
            handler,
            user_agent: config.user_agent,
        }
    }

    /// Execute with a fresh context.
    pub async fn execute(&self, request: Request) -> Result<Response, HttpError> {
        let mut ctx = ExchangeContext::new();
        self.execute_with_context(request, &mut ctx).await
    }

    /// Execute threading the caller's context (deadline in, exchange id and
    /// redirect history out).
    pub async fn execute_with_context(
        &self,
        mut request: Request,
        ctx: &mut ExchangeContext,
    ) -> Result<Response, HttpError> {
        if let Some(ua) = &self.user_agent {
            if !request.headers.contains("user-agent") {
                request.headers.push("User-Agent", ua.clone());
            }
        }
        self.handler.send(request, ctx).await
    }

    pub async fn get(&self, url: Url) -> Result<Response, HttpError> {
        self.execute(Request::get(url)).await
    }
}
