/*
 * exchange.rs
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

//! Exchange identity and the persistence boundary of the exchange logger.
//!
//! An `ExchangeId` names one logical request/response exchange (spanning
//! every redirect hop). Its textual forms sort lexicographically in time
//! order, ascending or descending, so a key-ordered store lists exchanges
//! chronologically either way.

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::HttpError;
use crate::message::{Request, Response};

/// 100 ns units since the Unix epoch.
fn ticks_now() -> u64 {
    let now = Utc::now();
    let nanos = now.timestamp_nanos_opt().unwrap_or(0).max(0);
    (nanos / 100) as u64
}

/// Identifies one logical exchange: UTC creation time (tick precision) plus a
/// process-random unique value. Immutable; equal only when both fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExchangeId {
    ticks: u64,
    unique: u64,
}

impl ExchangeId {
    pub fn new() -> Self {
        Self {
            ticks: ticks_now(),
            unique: rand::random(),
        }
    }

    pub fn from_parts(ticks: u64, unique: u64) -> Self {
        Self { ticks, unique }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        let nanos = (self.ticks as i64).saturating_mul(100);
        Utc.timestamp_nanos(nanos)
    }

    /// Fixed-width form sorting oldest first: zero-padded tick count, then
    /// the unique value in hex.
    pub fn ascending_form(&self) -> String {
        format!("{:020}{:016x}", self.ticks, self.unique)
    }

    /// Fixed-width form sorting newest first: max ticks minus tick count,
    /// then the unique value in hex.
    pub fn descending_form(&self) -> String {
        format!("{:020}{:016x}", u64::MAX - self.ticks, self.unique)
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ascending_form())
    }
}

/// Abstract key/bytes store the exchange logger writes to. Filesystem and
/// cloud backends implement this elsewhere; any of them is interchangeable.
pub trait ExchangeStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, data: Vec<u8>) -> io::Result<()>;
}

/// Converts a request, response, or failure into zero or more (key, bytes)
/// entries for the store.
pub trait ExchangeSerializer: Send + Sync {
    fn serialize_request(&self, id: &ExchangeId, request: &Request) -> Vec<(String, Vec<u8>)>;
    fn serialize_response(&self, id: &ExchangeId, response: &Response) -> Vec<(String, Vec<u8>)>;
    fn serialize_error(&self, id: &ExchangeId, error: &HttpError) -> Vec<(String, Vec<u8>)>;
}

/// In-memory store, mainly for tests.
#[derive(Default)]
pub struct MemoryExchangeStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryExchangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl ExchangeStore for MemoryExchangeStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, data: Vec<u8>) -> io::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), data);
        Ok(())
    }
}

/// Plain-text serializer: request/status line plus headers, one entry per
/// message, keyed under the exchange id's ascending form.
#[derive(Default)]
pub struct TextExchangeSerializer;

impl TextExchangeSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl ExchangeSerializer for TextExchangeSerializer {
    fn serialize_request(&self, id: &ExchangeId, request: &Request) -> Vec<(String, Vec<u8>)> {
        let mut text = format!(
            "{} {} {}\r\n",
            request.method.as_str(),
            request.url,
            request.version.as_str()
        );
        for (name, value) in request.headers.iter() {
            text.push_str(&format!("{}: {}\r\n", name, value));
        }
        vec![(format!("{}/request", id.ascending_form()), text.into_bytes())]
    }

    fn serialize_response(&self, id: &ExchangeId, response: &Response) -> Vec<(String, Vec<u8>)> {
        let mut text = format!(
            "{} {} {}\r\n",
            response.version.as_str(),
            response.status,
            response.reason
        );
        for (name, value) in response.headers.iter() {
            text.push_str(&format!("{}: {}\r\n", name, value));
        }
        vec![(
            format!("{}/response", id.ascending_form()),
            text.into_bytes(),
        )]
    }

    fn serialize_error(&self, id: &ExchangeId, error: &HttpError) -> Vec<(String, Vec<u8>)> {
        vec![(
            format!("{}/error", id.ascending_form()),
            error.to_string().into_bytes(),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_needs_both_fields() {
        let a = ExchangeId::from_parts(1000, 42);
        let b = ExchangeId::from_parts(1000, 42);
        let c = ExchangeId::from_parts(1000, 43);
        let d = ExchangeId::from_parts(1001, 42);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn ascending_form_sorts_with_time() {
        let old = ExchangeId::from_parts(1_000, 0xffff_ffff_ffff_ffff);
        let new = ExchangeId::from_parts(2_000, 0x0000_0000_0000_0001);
        assert!(old.ascending_form() < new.ascending_form());
        assert!(old.descending_form() > new.descending_form());
    }

    #[test]
    fn forms_are_fixed_width() {
        let id = ExchangeId::from_parts(7, 9);
        assert_eq!(id.ascending_form().len(), 36);
        assert_eq!(id.descending_form().len(), 36);
    }

    #[test]
    fn created_at_round_trips_ticks() {
        let id = ExchangeId::new();
        let again = ExchangeId::from_parts(
            (id.created_at().timestamp_nanos_opt().unwrap() / 100) as u64,
            0,
        );
        assert_eq!(id.ascending_form()[..20], again.ascending_form()[..20]);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryExchangeStore::new();
        store.set("k", b"v".to_vec()).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some(&b"v"[..]));
        assert_eq!(store.get("missing").unwrap(), None);
    }
}
