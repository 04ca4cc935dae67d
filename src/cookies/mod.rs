//! Cookie jar files
//!
//! The transfer engine keeps cookies in a Netscape-format jar file (the
//! format curl and wget use). Before a transfer the jar is read; on every
//! request of the transfer, redirects included, matching cookies are replayed
//! and each `Set-Cookie` header is merged back. The jar is written out again
//! once the transfer finishes.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use url::Url;

use crate::error::Result;

pub mod netscape;
pub mod set_cookie;
pub mod store;

pub use store::SharedJar;

/// A single stored cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Host or domain without a leading dot, lowercase.
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    /// Unix timestamp; 0 marks a session cookie.
    pub expires: u64,
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires != 0 && self.expires <= now
    }

    fn same_slot(&self, other: &Cookie) -> bool {
        self.domain == other.domain && self.path == other.path && self.name == other.name
    }

    fn matches_url(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(host) => host.to_ascii_lowercase(),
            None => return false,
        };

        let domain_ok = host == self.domain
            || (self.include_subdomains && host.ends_with(&format!(".{}", self.domain)));
        if !domain_ok {
            return false;
        }

        if self.secure && url.scheme() != "https" {
            return false;
        }

        path_matches(url.path(), &self.path)
    }
}

/// RFC 6265 path-match
fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    if !request_path.starts_with(cookie_path) {
        return false;
    }
    cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/')
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// In-memory view of one jar file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a jar file; a file that does not exist yet is an empty jar.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("cookie jar {} does not exist yet", path.display());
            return Ok(Self::new());
        }

        let file = File::open(path)?;
        let cookies = netscape::parse(BufReader::new(file))?;
        debug!("loaded {} cookies from {}", cookies.len(), path.display());
        Ok(Self { cookies })
    }

    /// Write the jar, dropping cookies that have already expired.
    pub fn save(&self, path: &Path) -> Result<()> {
        let now = unix_now();
        let live: Vec<&Cookie> = self.cookies.iter().filter(|c| !c.is_expired(now)).collect();
        std::fs::write(path, netscape::serialize(live))?;
        debug!("saved cookie jar {}", path.display());
        Ok(())
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Add a cookie, replacing any cookie with the same domain, path and name.
    /// An expired cookie only removes its predecessor.
    pub fn insert(&mut self, cookie: Cookie, now: u64) {
        self.cookies.retain(|existing| !existing.same_slot(&cookie));
        if !cookie.is_expired(now) {
            self.cookies.push(cookie);
        }
    }

    /// Merge the `Set-Cookie` header values received for `url`.
    pub fn store_response_cookies<'a, I>(&mut self, url: &Url, set_cookies: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let now = unix_now();
        for header in set_cookies {
            match set_cookie::parse(header, url, now) {
                Some(cookie) => self.insert(cookie, now),
                None => debug!("ignoring Set-Cookie for {}", url),
            }
        }
    }

    /// `Cookie` header value for a request to `url`, longest paths first.
    pub fn request_header(&self, url: &Url) -> Option<String> {
        let now = unix_now();
        let mut matching: Vec<&Cookie> = self
            .cookies
            .iter()
            .filter(|c| !c.is_expired(now) && c.matches_url(url))
            .collect();
        if matching.is_empty() {
            return None;
        }

        matching.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matching
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
