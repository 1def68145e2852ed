/*
 * logging.rs
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

//! Exchange logger: one id per outbound request, the request logged before
//! forwarding, then exactly one of the response or the failure. A failure is
//! recorded and re-raised, never swallowed.

use std::sync::Arc;

use crate::exchange::{ExchangeId, ExchangeSerializer, ExchangeStore};
use crate::handler::{ExchangeContext, HandlerFuture, MessageHandler};
use crate::message::Request;

pub struct ExchangeLogger {
    inner: Box<dyn MessageHandler>,
    store: Arc<dyn ExchangeStore>,
    serializer: Arc<dyn ExchangeSerializer>,
    /// When disabled, the id is still used for log keys but never placed on
    /// the exchange context.
    assign_exchange_id: bool,
}

impl ExchangeLogger {
    pub fn new(
        inner: Box<dyn MessageHandler>,
        store: Arc<dyn ExchangeStore>,
        serializer: Arc<dyn ExchangeSerializer>,
    ) -> Self {
        Self {
            inner,
            store,
            serializer,
            assign_exchange_id: true,
        }
    }

    pub fn assign_exchange_id(mut self, assign: bool) -> Self {
        self.assign_exchange_id = assign;
        self
    }

    fn write_entries(&self, entries: Vec<(String, Vec<u8>)>) -> Result<(), crate::error::HttpError> {
        for (key, data) in entries {
            self.store.set(&key, data)?;
        }
        Ok(())
    }
}

impl MessageHandler for ExchangeLogger {
    fn send<'a>(&'a self, request: Request, ctx: &'a mut ExchangeContext) -> HandlerFuture<'a> {
        Box::pin(async move {
            let id = ExchangeId::new();
            if self.assign_exchange_id {
                ctx.exchange_id = Some(id);
            }
            tracing::debug!(exchange = %id, method = request.method.as_str(), url = %request.url, "exchange start");
            self.write_entries(self.serializer.serialize_request(&id, &request))?;

            match self.inner.send(request, ctx).await {
                Ok(response) => {
                    self.write_entries(self.serializer.serialize_response(&id, &response))?;
                    tracing::debug!(exchange = %id, status = response.status, "exchange complete");
                    Ok(response)
                }
                Err(error) => {
                    self.write_entries(self.serializer.serialize_error(&id, &error))?;
                    tracing::debug!(exchange = %id, error = %error, "exchange failed");
                    Err(error)
                }
            }
        })
    }

    fn inner_handler(&mut self) -> Option<&mut dyn MessageHandler> {
        Some(self.inner.as_mut())
    }
}
