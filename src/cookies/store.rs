//! reqwest cookie provider backed by jar files
//!
//! reqwest consults the provider on every hop of a transfer, so a cookie set
//! on a redirect response is replayed on the next request and ends up in the
//! jar that gets saved afterwards.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use url::Url;

use super::CookieJar;

/// Jar state shared with a reqwest client for one transfer
#[derive(Debug)]
pub struct SharedJar {
    state: Mutex<JarState>,
    /// Caller-supplied `Cookie` header and the host it was addressed to
    request_cookies: Option<(String, String)>,
}

#[derive(Debug)]
struct JarState {
    /// Cookies sent with each request
    outgoing: CookieJar,
    /// Separate jar receiving new cookies when reads and writes use
    /// different files
    target: Option<CookieJar>,
}

impl SharedJar {
    pub fn new(jar: CookieJar) -> Self {
        Self {
            state: Mutex::new(JarState {
                outgoing: jar,
                target: None,
            }),
            request_cookies: None,
        }
    }

    /// Record received cookies into `target` as well as the outgoing jar.
    pub fn with_target(self, target: CookieJar) -> Self {
        let mut state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        state.target = Some(target);
        Self {
            state: Mutex::new(state),
            request_cookies: self.request_cookies,
        }
    }

    /// Send `header` ahead of the jar cookies on requests to the host of `url`.
    pub fn with_request_cookies(mut self, url: &Url, header: &str) -> Self {
        if let Some(host) = url.host_str() {
            self.request_cookies = Some((host.to_ascii_lowercase(), header.to_string()));
        }
        self
    }

    /// The jar to persist after the transfer
    pub fn snapshot(&self) -> CookieJar {
        let state = self.lock();
        state.target.as_ref().unwrap_or(&state.outgoing).clone()
    }

    fn lock(&self) -> MutexGuard<'_, JarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request_cookies_for(&self, url: &Url) -> Option<&str> {
        let (host, header) = self.request_cookies.as_ref()?;
        let matches = url
            .host_str()
            .is_some_and(|h| h.eq_ignore_ascii_case(host));
        matches.then_some(header.as_str())
    }
}

impl CookieStore for SharedJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&str> = cookie_headers.filter_map(|v| v.to_str().ok()).collect();
        debug!("{} Set-Cookie header(s) from {}", headers.len(), url);

        let mut state = self.lock();
        state
            .outgoing
            .store_response_cookies(url, headers.iter().copied());
        if let Some(target) = state.target.as_mut() {
            target.store_response_cookies(url, headers.iter().copied());
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let from_jar = self.lock().outgoing.request_header(url);
        let header = merge_cookie_header(self.request_cookies_for(url), from_jar)?;
        match HeaderValue::from_str(&header) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("dropping unsendable Cookie header for {}: {}", url, e);
                None
            }
        }
    }
}

/// Jar cookies appended to a caller-supplied Cookie header
fn merge_cookie_header(existing: Option<&str>, from_jar: Option<String>) -> Option<String> {
    match (existing, from_jar) {
        (Some(existing), Some(jar)) => Some(format!("{}; {}", existing, jar)),
        (Some(existing), None) => Some(existing.to_string()),
        (None, jar) => jar,
    }
}
