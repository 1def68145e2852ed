/*
 * headers.rs
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

//! Ordered header multimap and RFC 2616 header-group classification.
//!
//! Names are compared ASCII case-insensitively; insertion order is preserved
//! and repeated names are allowed (Set-Cookie, Via, ...).

use std::collections::HashMap;
use std::sync::OnceLock;

/// Ordered multimap of header name/value pairs.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a header, preserving insertion order. Repeated names accumulate.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replace every occurrence of `name` with a single entry, or append if absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// First value for `name`, case-insensitive.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Remove every occurrence of `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Group a header name belongs to. Decides whether a parsed response header
/// attaches to the message header set or to the body's content-header set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderGroup {
    General,
    Request,
    Response,
    Content,
}

static GROUPS: OnceLock<HashMap<&'static str, HeaderGroup>> = OnceLock::new();

fn group_table() -> &'static HashMap<&'static str, HeaderGroup> {
    GROUPS.get_or_init(|| {
        let mut t = HashMap::new();
        for name in [
            "cache-control",
            "connection",
            "date",
            "pragma",
            "trailer",
            "transfer-encoding",
            "upgrade",
            "via",
            "warning",
        ] {
            t.insert(name, HeaderGroup::General);
        }
        for name in [
            "accept",
            "accept-charset",
            "accept-encoding",
            "accept-language",
            "authorization",
            "cookie",
            "expect",
            "from",
            "host",
            "if-match",
            "if-modified-since",
            "if-none-match",
            "if-range",
            "if-unmodified-since",
            "max-forwards",
            "proxy-authorization",
            "range",
            "referer",
            "te",
            "user-agent",
        ] {
            t.insert(name, HeaderGroup::Request);
        }
        for name in [
            "accept-ranges",
            "age",
            "etag",
            "location",
            "proxy-authenticate",
            "retry-after",
            "server",
            "set-cookie",
            "vary",
            "www-authenticate",
        ] {
            t.insert(name, HeaderGroup::Response);
        }
        for name in [
            "allow",
            "content-disposition",
            "content-encoding",
            "content-language",
            "content-length",
            "content-location",
            "content-md5",
            "content-range",
            "content-type",
            "expires",
            "last-modified",
        ] {
            t.insert(name, HeaderGroup::Content);
        }
        t
    })
}

/// Classify a header name. Pure function of the name; unknown names map to
/// `General` and thus stay on the message header set.
pub fn classify(name: &str) -> HeaderGroup {
    let lower = name.to_ascii_lowercase();
    group_table()
        .get(lower.as_str())
        .copied()
        .unwrap_or(HeaderGroup::General)
}
