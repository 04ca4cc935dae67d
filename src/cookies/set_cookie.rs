//! `Set-Cookie` header parsing (the subset of RFC 6265 a jar file can hold)

use std::time::UNIX_EPOCH;

use url::Url;

use super::Cookie;

/// Parse one `Set-Cookie` value received from `url`.
///
/// Returns `None` for headers without a `name=value` pair and for cookies
/// whose `Domain` attribute does not cover the responding host. A cookie
/// that should be deleted comes back with an expiry in the past.
pub fn parse(header: &str, url: &Url, now: u64) -> Option<Cookie> {
    let host = url.host_str()?.to_ascii_lowercase();
    let mut parts = header.split(';');

    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = Cookie {
        domain: host.clone(),
        include_subdomains: false,
        path: default_path(url.path()),
        secure: false,
        http_only: false,
        expires: 0,
        name: name.to_string(),
        value: value.trim().trim_matches('"').to_string(),
    };
    let mut max_age: Option<i64> = None;

    for attribute in parts {
        let (key, val) = match attribute.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (attribute.trim(), ""),
        };

        match key.to_ascii_lowercase().as_str() {
            "domain" if !val.is_empty() => {
                let domain = val.trim_start_matches('.').to_ascii_lowercase();
                if host != domain && !host.ends_with(&format!(".{}", domain)) {
                    return None;
                }
                cookie.domain = domain;
                cookie.include_subdomains = true;
            }
            "path" if val.starts_with('/') => cookie.path = val.to_string(),
            "secure" => cookie.secure = true,
            "httponly" => cookie.http_only = true,
            "expires" => {
                if let Ok(time) = httpdate::parse_http_date(val) {
                    cookie.expires = time
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs().max(1))
                        .unwrap_or(1);
                }
            }
            "max-age" => max_age = val.parse().ok(),
            _ => {}
        }
    }

    // Max-Age wins over Expires
    if let Some(seconds) = max_age {
        cookie.expires = if seconds <= 0 {
            1
        } else {
            now.saturating_add(seconds as u64)
        };
    }

    Some(cookie)
}

/// Directory of the request path, per RFC 6265 section 5.1.4
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}
