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

//! Cookie jar boundary and an in-memory implementation. The jar is the one
//! object mutated across concurrent exchanges, so implementations serialize
//! access internally.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use url::Url;

/// One stored cookie.
#[derive(Debug, Clone)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Domain the cookie applies to; exact host when no Domain attribute was
    /// given (`host_only`).
    pub domain: String,
    pub host_only: bool,
    pub path: String,
    pub secure: bool,
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if self.secure && url.scheme() != "https" {
            return false;
        }
        let domain_ok = if self.host_only {
            host.eq_ignore_ascii_case(&self.domain)
        } else {
            let host = host.to_ascii_lowercase();
            let domain = self.domain.to_ascii_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        };
        if !domain_ok {
            return false;
        }
        let path = url.path();
        path == self.path
            || (path.starts_with(&self.path)
                && (self.path.ends_with('/')
                    || path.as_bytes().get(self.path.len()) == Some(&b'/')))
    }

    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.map_or(false, |e| e <= now)
    }
}

/// Abstract jar: produce the Cookie header value for a request URI, absorb
/// Set-Cookie header values keyed by the response's own request URI.
pub trait CookieJar: Send + Sync {
    fn cookie_header_value(&self, url: &Url) -> String;
    fn set_cookies_from_header(&self, url: &Url, header_value: &str);
    fn entries(&self) -> Vec<Cookie>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory jar with host/path matching and Max-Age/Expires deletion.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<Cookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Default cookie path per RFC 6265 §5.1.4: the request path up to but not
/// including its last segment.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

/// Parse one Set-Cookie value into a cookie scoped to `url`. Returns `None`
/// for values without a name=value pair.
fn parse_set_cookie(url: &Url, header_value: &str) -> Option<Cookie> {
    let mut parts = header_value.split(';');
    let pair = parts.next()?.trim();
    let eq = pair.find('=')?;
    let name = pair[..eq].trim();
    if name.is_empty() {
        return None;
    }
    let value = pair[eq + 1..].trim();

    let mut cookie = Cookie {
        name: name.to_string(),
        value: value.to_string(),
        domain: url.host_str()?.to_string(),
        host_only: true,
        path: default_path(url),
        secure: false,
        expires: None,
    };
    let mut max_age: Option<i64> = None;
    for attr in parts {
        let attr = attr.trim();
        let (key, val) = match attr.find('=') {
            Some(i) => (&attr[..i], attr[i + 1..].trim()),
            None => (attr, ""),
        };
        match key.to_ascii_lowercase().as_str() {
            "domain" => {
                let val = val.trim_start_matches('.');
                if !val.is_empty() {
                    cookie.domain = val.to_string();
                    cookie.host_only = false;
                }
            }
            "path" => {
                if val.starts_with('/') {
                    cookie.path = val.to_string();
                }
            }
            "secure" => cookie.secure = true,
            "max-age" => max_age = val.parse().ok(),
            "expires" => {
                if let Ok(t) = DateTime::parse_from_rfc2822(val) {
                    cookie.expires = Some(t.with_timezone(&Utc));
                }
            }
            _ => {}
        }
    }
    // Max-Age wins over Expires when both are present; zero or negative
    // means immediate deletion.
    if let Some(secs) = max_age {
        cookie.expires = Some(if secs <= 0 {
            Utc::now() - chrono::Duration::seconds(1)
        } else {
            Utc::now() + chrono::Duration::seconds(secs)
        });
    }
    Some(cookie)
}

impl CookieJar for MemoryCookieJar {
    fn cookie_header_value(&self, url: &Url) -> String {
        let now = Utc::now();
        let cookies = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        let mut parts = Vec::new();
        for c in cookies.iter() {
            if !c.expired(now) && c.matches(url) {
                parts.push(format!("{}={}", c.name, c.value));
            }
        }
        parts.join("; ")
    }

    fn set_cookies_from_header(&self, url: &Url, header_value: &str) {
        let Some(cookie) = parse_set_cookie(url, header_value) else {
            return;
        };
        let now = Utc::now();
        let mut cookies = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        cookies.retain(|c| {
            !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
        });
        if !cookie.expired(now) {
            cookies.push(cookie);
        }
    }

    fn entries(&self) -> Vec<Cookie> {
        self.cookies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn len(&self) -> usize {
        self.cookies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn set_and_get_round_trip() {
        let jar = MemoryCookieJar::new();
        jar.set_cookies_from_header(&url("http://example.com/a"), "sid=abc123");
        assert_eq!(jar.len(), 1);
        assert_eq!(
            jar.cookie_header_value(&url("http://example.com/a/b")),
            "sid=abc123"
        );
    }

    #[test]
    fn host_only_cookie_does_not_leak_to_subdomains() {
        let jar = MemoryCookieJar::new();
        jar.set_cookies_from_header(&url("http://example.com/"), "a=1");
        assert_eq!(jar.cookie_header_value(&url("http://sub.example.com/")), "");
        jar.set_cookies_from_header(&url("http://example.com/"), "b=2; Domain=example.com");
        assert_eq!(
            jar.cookie_header_value(&url("http://sub.example.com/")),
            "b=2"
        );
    }

    #[test]
    fn secure_cookie_requires_https() {
        let jar = MemoryCookieJar::new();
        jar.set_cookies_from_header(&url("https://example.com/"), "s=1; Secure");
        assert_eq!(jar.cookie_header_value(&url("http://example.com/")), "");
        assert_eq!(jar.cookie_header_value(&url("https://example.com/")), "s=1");
    }

    #[test]
    fn max_age_zero_deletes() {
        let jar = MemoryCookieJar::new();
        jar.set_cookies_from_header(&url("http://example.com/"), "a=1");
        jar.set_cookies_from_header(&url("http://example.com/"), "a=; Max-Age=0");
        assert_eq!(jar.len(), 0);
    }

    #[test]
    fn path_matching_respects_segments() {
        let jar = MemoryCookieJar::new();
        jar.set_cookies_from_header(&url("http://example.com/"), "a=1; Path=/api");
        assert_eq!(jar.cookie_header_value(&url("http://example.com/api")), "a=1");
        assert_eq!(
            jar.cookie_header_value(&url("http://example.com/api/v1")),
            "a=1"
        );
        assert_eq!(jar.cookie_header_value(&url("http://example.com/apix")), "");
    }

    #[test]
    fn replaces_by_name_domain_path() {
        let jar = MemoryCookieJar::new();
        jar.set_cookies_from_header(&url("http://example.com/"), "a=1");
        jar.set_cookies_from_header(&url("http://example.com/"), "a=2");
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.cookie_header_value(&url("http://example.com/")), "a=2");
    }
}
