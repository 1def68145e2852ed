/*
 * transport.rs
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

//! Terminal handler: obtains a byte stream and runs the engine. The stream
//! comes from a caller-supplied pre-connected socket (used once, e.g. one
//! tunneled through a proxy), a caller-supplied factory, or the TCP
//! connector. Attaches the sent request to the produced response.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncWrite};

use crate::engine;
use crate::error::HttpError;
use crate::handler::{ExchangeContext, HandlerFuture, MessageHandler};
use crate::message::Request;
use crate::net::Connector;

/// Bidirectional byte stream usable as an exchange transport.
pub trait Socket: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Socket for T {}

pub type BoxedSocket = Box<dyn Socket>;

type SocketFuture = Pin<Box<dyn Future<Output = io::Result<BoxedSocket>> + Send>>;

/// Stream factory invoked with the outbound request; lets callers route each
/// exchange over their own transport (SOCKS tunnels and the like).
pub trait SocketFactory: Send + Sync {
    fn open(&self, request: &Request) -> SocketFuture;
}

enum Source {
    Connector(Connector),
    Socket(Mutex<Option<BoxedSocket>>),
    Factory(Box<dyn SocketFactory>),
}

pub struct TransportHandler {
    source: Source,
}

impl TransportHandler {
    /// Dial TCP per request.
    pub fn new(connector: Connector) -> Self {
        Self {
            source: Source::Connector(connector),
        }
    }

    /// Use one pre-connected socket. It is consumed by the first exchange; a
    /// second send through this handler is a configuration error.
    pub fn with_socket(socket: BoxedSocket) -> Self {
        Self {
            source: Source::Socket(Mutex::new(Some(socket))),
        }
    }

    pub fn with_factory(factory: Box<dyn SocketFactory>) -> Self {
        Self {
            source: Source::Factory(factory),
        }
    }

    async fn open_socket(&self, request: &Request) -> Result<BoxedSocket, HttpError> {
        match &self.source {
            Source::Connector(connector) => {
                let Some(host) = request.url.host_str() else {
                    return Err(HttpError::Configuration(
                        "request URL has no host".to_string(),
                    ));
                };
                // Scheme already validated as http/https, so the known
                // default is always available.
                let port = request.url.port_or_known_default().unwrap_or(80);
                let tcp = connector.connect(host, port).await?;
                Ok(Box::new(tcp))
            }
            Source::Socket(slot) => {
                let taken = slot.lock().unwrap_or_else(|e| e.into_inner()).take();
                taken.ok_or_else(|| {
                    HttpError::Configuration(
                        "pre-connected socket already consumed by an earlier exchange"
                            .to_string(),
                    )
                })
            }
            Source::Factory(factory) => Ok(factory.open(request).await?),
        }
    }
}

impl MessageHandler for TransportHandler {
    fn send<'a>(&'a self, request: Request, ctx: &'a mut ExchangeContext) -> HandlerFuture<'a> {
        Box::pin(async move {
            engine::validate(&request)?;
            let socket = self.open_socket(&request).await?;
            let request = Arc::new(request);
            let mut response = engine::execute(&request, socket, ctx.deadline).await?;
            response.request = Some(request);
            Ok(response)
        })
    }
}
