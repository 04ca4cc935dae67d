//! Outbound request description handed to a transfer engine

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use url::form_urlencoded;

use crate::config::HttpMethod;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Redirects are not followed unless an option asks for it.
pub const DEFAULT_MAX_REDIRECTS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RequestBody {
    /// `application/x-www-form-urlencoded` body from form fields
    pub fn form<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        Self {
            content_type: Some(FORM_CONTENT_TYPE.to_string()),
            data: encode_form(fields).into_bytes(),
        }
    }
}

/// Urlencode form fields in iteration order
pub fn encode_form<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

/// Where the engine replays cookies from and persists them to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieJarPaths {
    pub read: PathBuf,
    pub write: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub follow: bool,
    pub max: u32,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            follow: false,
            max: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Everything a transfer engine needs to perform one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub cookie_jar: Option<CookieJarPaths>,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub redirects: RedirectPolicy,
    pub proxy: Option<String>,
    pub verify_peer: bool,
    pub ca_certificate: Option<PathBuf>,
    /// When false the engine writes the body to stdout instead of returning it.
    pub return_body: bool,
    /// Options the typed model does not cover, passed through by name.
    pub custom: BTreeMap<String, String>,
}

impl TransferRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: None,
            cookie_jar: None,
            timeout: None,
            connect_timeout: None,
            redirects: RedirectPolicy::default(),
            proxy: None,
            verify_peer: true,
            ca_certificate: None,
            return_body: true,
            custom: BTreeMap::new(),
        }
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Replace every header called `name` with a single value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
    }

    /// Body as text, if any
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(&body.data).into_owned())
    }

    /// Decoded form fields of a urlencoded body
    pub fn form_fields(&self) -> HashMap<String, String> {
        self.body
            .as_ref()
            .map(|body| {
                form_urlencoded::parse(&body.data)
                    .into_owned()
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default()
    }
}
