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

//! Message-handler middleware: each handler receives a request, optionally
//! forwards to an inner handler, and observes or transforms the result.
//! Redirect following, decompression, cookies, and exchange logging stack
//! this way around the transport handler at the bottom.
//!
//! Per-exchange state that the original design hung off an ambient property
//! bag (exchange id, redirect history, deadline) travels in an explicit
//! `ExchangeContext` threaded alongside the request.

mod cookies;
mod decompress;
mod logging;
mod redirect;
mod transport;

pub use cookies::CookieHandler;
pub use decompress::Decompressor;
pub use logging::ExchangeLogger;
pub use redirect::{RedirectFollower, RedirectPolicy};
pub use transport::{BoxedSocket, Socket, SocketFactory, TransportHandler};

use std::future::Future;
use std::pin::Pin;

use tokio::time::Instant;

use crate::error::HttpError;
use crate::exchange::ExchangeId;
use crate::message::{RedirectHistoryEntry, Request, Response};

/// Boxed future returned by `MessageHandler::send`.
pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Response, HttpError>> + Send + 'a>>;

/// Explicit per-exchange context. One instance spans an entire logical
/// exchange, including every redirect-regenerated request.
#[derive(Debug, Default)]
pub struct ExchangeContext {
    /// Correlation id assigned by the exchange logger (when enabled).
    pub exchange_id: Option<ExchangeId>,
    /// Hop-by-hop history attached by the redirect follower when tracking is
    /// enabled; absent otherwise.
    pub redirect_history: Option<Vec<RedirectHistoryEntry>>,
    /// Cooperative cancellation: checked at every suspension point in the
    /// engine.
    pub deadline: Option<Instant>,
}

impl ExchangeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::default()
        }
    }
}

/// Uniform middleware contract: handle the request, optionally forward to
/// the inner handler, observe/transform the result.
pub trait MessageHandler: Send + Sync {
    fn send<'a>(&'a self, request: Request, ctx: &'a mut ExchangeContext) -> HandlerFuture<'a>;

    /// The next handler down the chain, when there is one. The redirect
    /// follower walks this to find nested instances of itself.
    fn inner_handler(&mut self) -> Option<&mut dyn MessageHandler> {
        None
    }

    /// Hook for the redirect follower's walk: handlers that follow redirects
    /// themselves disable that behavior here so redirects are followed once,
    /// at the outermost layer. Default is a no-op.
    fn set_follow_redirects(&mut self, _enabled: bool) {}
}
