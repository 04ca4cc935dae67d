//! Netscape cookie file format
//!
//! One cookie per line, seven TAB-separated fields:
//! `domain`, `include_subdomains`, `path`, `secure`, `expires`, `name`, `value`.
//! Lines starting with `#` are comments, except the `#HttpOnly_` domain prefix.

use std::io::BufRead;

use log::warn;

use super::Cookie;
use crate::error::Result;

const HEADER: &str = "# Netscape HTTP Cookie File\n# This file was generated by easyfetch. Edit at your own risk.\n\n";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Parse a jar, skipping malformed lines with a warning.
pub fn parse(reader: impl BufRead) -> Result<Vec<Cookie>> {
    let mut cookies = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty() {
            continue;
        }

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        match parse_line(line, http_only) {
            Ok(cookie) => cookies.push(cookie),
            Err(reason) => warn!("skipping cookie jar line {}: {}", idx + 1, reason),
        }
    }

    Ok(cookies)
}

fn parse_line(line: &str, http_only: bool) -> std::result::Result<Cookie, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    // curl writes six fields when the value is empty
    if fields.len() != 7 && fields.len() != 6 {
        return Err(format!(
            "expected 7 TAB-separated fields, found {}",
            fields.len()
        ));
    }

    let domain = fields[0].trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return Err("domain field is empty".to_string());
    }

    let include_subdomains = parse_flag(fields[1], "include_subdomains")?;
    let secure = parse_flag(fields[3], "secure")?;
    let expires = fields[4]
        .parse::<u64>()
        .map_err(|_| format!("expires must be a non-negative integer, got '{}'", fields[4]))?;

    let name = fields[5].to_string();
    if name.is_empty() {
        return Err("cookie name field is empty".to_string());
    }

    Ok(Cookie {
        domain,
        include_subdomains,
        path: fields[2].to_string(),
        secure,
        http_only,
        expires,
        name,
        value: fields.get(6).map(|v| v.to_string()).unwrap_or_default(),
    })
}

fn parse_flag(value: &str, field: &str) -> std::result::Result<bool, String> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        _ => Err(format!("{} must be TRUE or FALSE, got '{}'", field, value)),
    }
}

fn flag(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Render cookies as a complete jar file, header included.
pub fn serialize<'a, I>(cookies: I) -> String
where
    I: IntoIterator<Item = &'a Cookie>,
{
    let mut out = String::from(HEADER);
    for cookie in cookies {
        let prefix = if cookie.http_only { HTTP_ONLY_PREFIX } else { "" };
        let dot = if cookie.include_subdomains { "." } else { "" };
        out.push_str(&format!(
            "{}{}{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            prefix,
            dot,
            cookie.domain,
            flag(cookie.include_subdomains),
            cookie.path,
            flag(cookie.secure),
            cookie.expires,
            cookie.name,
            cookie.value
        ));
    }
    out
}
