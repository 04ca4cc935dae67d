//! Configuration management for easyfetch

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{FetchError, Result};
use crate::utils::FileUtils;

/// User agent sent when the caller never sets one.
pub const DEFAULT_USER_AGENT: &str = "easyfetch";

/// Suffix appended to every outgoing User-Agent.
pub const RUNTIME_VERSION: &str = concat!("easyfetch/", env!("CARGO_PKG_VERSION"));

/// File name of the default cookie jar inside the temp directory.
pub const DEFAULT_COOKIE_JAR_NAME: &str = "cookies.txt";

pub const ENV_USER_AGENT: &str = "EASYFETCH_USER_AGENT";
pub const ENV_COOKIE_JAR: &str = "EASYFETCH_COOKIE_JAR";

/// HTTP method enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Trace,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        };
        write!(f, "{}", method)
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "PATCH" => Ok(HttpMethod::Patch),
            "TRACE" => Ok(HttpMethod::Trace),
            _ => Err(()),
        }
    }
}

/// Construction-time defaults of a [`Fetcher`](crate::Fetcher).
///
/// `reset()` restores the fetcher to exactly these values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub user_agent: String,
    pub cookie_jar: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie_jar: env::temp_dir().join(DEFAULT_COOKIE_JAR_NAME),
        }
    }
}

impl Config {
    /// Defaults overridden by `EASYFETCH_USER_AGENT` and `EASYFETCH_COOKIE_JAR`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(agent) = lookup(ENV_USER_AGENT) {
            if agent.trim().is_empty() {
                return Err(FetchError::Config(format!("{} is empty", ENV_USER_AGENT)));
            }
            config.user_agent = agent;
        }

        if let Some(jar) = lookup(ENV_COOKIE_JAR) {
            if jar.trim().is_empty() {
                return Err(FetchError::Config(format!("{} is empty", ENV_COOKIE_JAR)));
            }
            config.cookie_jar = FileUtils::expand_path(&jar)?;
        }

        Ok(config)
    }
}
