//! Typed transfer options
//!
//! Options are applied after every default the fetcher sets, so each one can
//! override the user agent, method, body or any engine setting. Anything the
//! typed model does not cover travels as [`TransferOption::Custom`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::HttpMethod;
use crate::error::{FetchError, Result};
use crate::http::auth::Auth;
use crate::http::request::{RequestBody, TransferRequest, FORM_CONTENT_TYPE};
use crate::utils::{FileUtils, StringUtils};

/// Identity of an option; setting an option with the same key replaces it.
///
/// Variant order is application order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    Timeout,
    ConnectTimeout,
    FollowRedirects,
    MaxRedirects,
    Proxy,
    VerifyPeer,
    CaCertificate,
    UserAgent,
    Referer,
    BasicAuth,
    Body,
    Method,
    /// Lowercase header name
    Header(String),
    ReturnTransfer,
    Custom(String),
}

impl OptionKey {
    pub fn header(name: &str) -> Self {
        OptionKey::Header(name.to_ascii_lowercase())
    }

    /// Custom keys ignore case and a leading `CURLOPT_`.
    pub fn custom(name: &str) -> Self {
        OptionKey::Custom(normalize_name(name))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            OptionKey::Header(name) | OptionKey::Custom(name) if name.trim().is_empty() => Err(
                FetchError::InvalidArgument("option name must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOption {
    Timeout(Duration),
    ConnectTimeout(Duration),
    FollowRedirects(bool),
    MaxRedirects(u32),
    Proxy(String),
    VerifyPeer(bool),
    CaCertificate(PathBuf),
    UserAgent(String),
    Referer(String),
    BasicAuth { username: String, password: String },
    /// Raw request body; switches a GET to POST.
    Body(String),
    Method(HttpMethod),
    Header { name: String, value: String },
    ReturnTransfer(bool),
    Custom { name: String, value: String },
}

impl TransferOption {
    pub fn key(&self) -> OptionKey {
        match self {
            TransferOption::Timeout(_) => OptionKey::Timeout,
            TransferOption::ConnectTimeout(_) => OptionKey::ConnectTimeout,
            TransferOption::FollowRedirects(_) => OptionKey::FollowRedirects,
            TransferOption::MaxRedirects(_) => OptionKey::MaxRedirects,
            TransferOption::Proxy(_) => OptionKey::Proxy,
            TransferOption::VerifyPeer(_) => OptionKey::VerifyPeer,
            TransferOption::CaCertificate(_) => OptionKey::CaCertificate,
            TransferOption::UserAgent(_) => OptionKey::UserAgent,
            TransferOption::Referer(_) => OptionKey::Referer,
            TransferOption::BasicAuth { .. } => OptionKey::BasicAuth,
            TransferOption::Body(_) => OptionKey::Body,
            TransferOption::Method(_) => OptionKey::Method,
            TransferOption::Header { name, .. } => OptionKey::header(name),
            TransferOption::ReturnTransfer(_) => OptionKey::ReturnTransfer,
            TransferOption::Custom { name, .. } => OptionKey::custom(name),
        }
    }

    /// Reject options carrying empty names or values.
    pub fn validate(&self) -> Result<()> {
        let empty = |what: &str| -> Result<()> {
            Err(FetchError::InvalidArgument(format!(
                "{} must not be empty",
                what
            )))
        };

        match self {
            TransferOption::Proxy(s) if s.trim().is_empty() => empty("proxy"),
            TransferOption::UserAgent(s) if s.trim().is_empty() => empty("user agent"),
            TransferOption::Referer(s) if s.trim().is_empty() => empty("referer"),
            TransferOption::Body(s) if s.is_empty() => empty("body"),
            TransferOption::CaCertificate(p) if p.as_os_str().is_empty() => {
                empty("CA certificate path")
            }
            TransferOption::BasicAuth { username, .. } if username.is_empty() => empty("username"),
            TransferOption::Header { name, value }
            | TransferOption::Custom { name, value }
                if name.trim().is_empty() || value.is_empty() =>
            {
                empty("option name and value")
            }
            _ => Ok(()),
        }
    }

    /// Build an option from a name/value pair.
    ///
    /// Well-known names (with or without a `CURLOPT_` prefix, any case) map to
    /// typed options; every other name becomes [`TransferOption::Custom`].
    pub fn parse(name: &str, value: &str) -> Result<Self> {
        if name.trim().is_empty() || value.is_empty() {
            return Err(FetchError::InvalidArgument(
                "option name and value must not be empty".to_string(),
            ));
        }

        let normalized = normalize_name(name);
        let invalid = |what: &str| {
            FetchError::InvalidArgument(format!("Invalid value '{}' for {}", value, what))
        };

        let option = match normalized.as_str() {
            "timeout" => TransferOption::Timeout(StringUtils::parse_timeout(value)?),
            "timeout_ms" => TransferOption::Timeout(Duration::from_millis(
                value.trim().parse().map_err(|_| invalid(name))?,
            )),
            "connecttimeout" | "connect_timeout" => {
                TransferOption::ConnectTimeout(StringUtils::parse_timeout(value)?)
            }
            "followlocation" | "follow_location" => {
                TransferOption::FollowRedirects(StringUtils::parse_bool(value)?)
            }
            "maxredirs" | "max_redirects" => {
                TransferOption::MaxRedirects(value.trim().parse().map_err(|_| invalid(name))?)
            }
            "proxy" => TransferOption::Proxy(value.to_string()),
            "ssl_verifypeer" | "verify_peer" => {
                TransferOption::VerifyPeer(StringUtils::parse_bool(value)?)
            }
            "cainfo" | "ca_info" => TransferOption::CaCertificate(FileUtils::expand_path(value)?),
            "useragent" | "user_agent" => TransferOption::UserAgent(value.to_string()),
            "referer" => TransferOption::Referer(value.to_string()),
            "customrequest" | "method" => {
                TransferOption::Method(value.parse().map_err(|_| invalid(name))?)
            }
            "httpheader" | "header" => {
                let (name, value) = StringUtils::parse_header(value)?;
                TransferOption::Header { name, value }
            }
            "userpwd" => {
                let (username, password) = Auth::parse_user_pass(value)?;
                TransferOption::BasicAuth { username, password }
            }
            "postfields" | "body" => TransferOption::Body(value.to_string()),
            "returntransfer" | "return_transfer" => {
                TransferOption::ReturnTransfer(StringUtils::parse_bool(value)?)
            }
            _ => TransferOption::Custom {
                name: normalized,
                value: value.to_string(),
            },
        };

        option.validate()?;
        Ok(option)
    }

    /// Write this option into an assembled request.
    pub fn apply(&self, request: &mut TransferRequest) {
        match self {
            TransferOption::Timeout(d) => request.timeout = Some(*d),
            TransferOption::ConnectTimeout(d) => request.connect_timeout = Some(*d),
            TransferOption::FollowRedirects(follow) => request.redirects.follow = *follow,
            TransferOption::MaxRedirects(max) => request.redirects.max = *max,
            TransferOption::Proxy(url) => request.proxy = Some(url.clone()),
            TransferOption::VerifyPeer(verify) => request.verify_peer = *verify,
            TransferOption::CaCertificate(path) => request.ca_certificate = Some(path.clone()),
            TransferOption::UserAgent(agent) => request.set_header("User-Agent", agent.clone()),
            TransferOption::Referer(referer) => request.set_header("Referer", referer.clone()),
            TransferOption::BasicAuth { username, password } => {
                request.set_header("Authorization", Auth::basic_auth(username, password))
            }
            TransferOption::Body(body) => {
                request.body = Some(RequestBody {
                    content_type: Some(FORM_CONTENT_TYPE.to_string()),
                    data: body.clone().into_bytes(),
                });
                if request.method == HttpMethod::Get {
                    request.method = HttpMethod::Post;
                }
            }
            TransferOption::Method(method) => request.method = *method,
            TransferOption::Header { name, value } => request.set_header(name.clone(), value.clone()),
            TransferOption::ReturnTransfer(enabled) => request.return_body = *enabled,
            TransferOption::Custom { name, value } => {
                request.custom.insert(normalize_name(name), value.clone());
            }
        }
    }
}

fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_ascii_lowercase();
    match lowered.strip_prefix("curlopt_") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

/// Caller-supplied options keyed by [`OptionKey`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOptions {
    entries: BTreeMap<OptionKey, TransferOption>,
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the replaced option.
    pub fn set(&mut self, option: TransferOption) -> Option<TransferOption> {
        self.entries.insert(option.key(), option)
    }

    pub fn remove(&mut self, key: &OptionKey) -> Option<TransferOption> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &OptionKey) -> Option<&TransferOption> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransferOption> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Apply every option in key order.
    pub fn apply_all(&self, request: &mut TransferRequest) {
        for option in self.entries.values() {
            option.apply(request);
        }
    }
}
