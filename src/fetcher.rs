//! Stateful request builder and executor
//!
//! A [`Fetcher`] accumulates request configuration through its setters and
//! then performs one blocking fetch through a [`Transport`]. User agent,
//! cookie jar and options persist between fetches; POST fields and the save
//! location are per-request state cleared by `fetch(.., reset_after = true)`.
//!
//! A `Fetcher` is not safe for concurrent use: every mutating method takes
//! `&mut self`, so sharing one across threads needs a `Mutex` around it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use reqwest::header::HeaderValue;

use crate::config::{Config, HttpMethod, RUNTIME_VERSION};
use crate::error::{FetchError, Result};
use crate::http::{
    CookieJarPaths, HttpClient, OptionKey, RequestBody, TransferOption, TransferOptions,
    TransferRequest, TransferResponse, Transport,
};
use crate::output::OutputWriter;
use crate::utils::FileUtils;

/// Mutable request state owned by one [`Fetcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestState {
    pub user_agent: String,
    pub cookie_jar: PathBuf,
    pub post_fields: BTreeMap<String, String>,
    pub save_file: Option<PathBuf>,
    pub options: TransferOptions,
}

impl RequestState {
    fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            cookie_jar: config.cookie_jar.clone(),
            post_fields: BTreeMap::new(),
            save_file: None,
            options: TransferOptions::new(),
        }
    }
}

pub struct Fetcher<T: Transport = HttpClient> {
    defaults: Config,
    state: RequestState,
    transport: T,
}

impl Fetcher<HttpClient> {
    /// Fetcher with default configuration and the reqwest engine
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self::with_transport_and_config(HttpClient::new()?, config))
    }
}

impl<T: Transport> Fetcher<T> {
    pub fn with_transport(transport: T) -> Self {
        Self::with_transport_and_config(transport, Config::default())
    }

    pub fn with_transport_and_config(transport: T, config: Config) -> Self {
        Self {
            state: RequestState::from_config(&config),
            defaults: config,
            transport,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.state.user_agent
    }

    pub fn cookie_jar_path(&self) -> &Path {
        &self.state.cookie_jar
    }

    pub fn post_fields(&self) -> &BTreeMap<String, String> {
        &self.state.post_fields
    }

    pub fn save_location(&self) -> Option<&Path> {
        self.state.save_file.as_deref()
    }

    pub fn options(&self) -> &TransferOptions {
        &self.state.options
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Set or overwrite one POST field; returns the stored value.
    pub fn set_post_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<&str> {
        let key = key.into();
        let value = value.into();
        let stored = self.state.post_fields.entry(key).or_default();
        *stored = value;
        Ok(stored.as_str())
    }

    /// Merge fields into the POST data; returns the merged fields.
    pub fn set_post_data<I, K, V>(&mut self, entries: I) -> Result<&BTreeMap<String, String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if entries.is_empty() {
            return Err(FetchError::InvalidArgument(
                "set_post_data expects at least one key/value pair".to_string(),
            ));
        }

        self.state.post_fields.extend(entries);
        Ok(&self.state.post_fields)
    }

    pub fn set_user_agent(&mut self, agent: impl Into<String>) -> Result<()> {
        let agent = agent.into();
        if agent.trim().is_empty() {
            return Err(FetchError::InvalidArgument(
                "set_user_agent expects a non-empty string".to_string(),
            ));
        }
        if HeaderValue::from_str(&agent).is_err() {
            return Err(FetchError::InvalidArgument(format!(
                "User agent {:?} is not a valid header value",
                agent
            )));
        }

        self.state.user_agent = agent;
        Ok(())
    }

    /// Write the next fetched body to `path`.
    ///
    /// The parent directory must exist and be writable. An existing file is
    /// only accepted when `overwrite` is true.
    pub fn set_save_location(&mut self, path: impl AsRef<Path>, overwrite: bool) -> Result<()> {
        let path = Self::expand_argument(path.as_ref(), "set_save_location")?;
        FileUtils::check_parent_writable(&path)?;

        if path.is_dir() {
            return Err(FetchError::InvalidArgument(format!(
                "`{}` is a directory",
                path.display()
            )));
        }
        if path.exists() && !overwrite {
            return Err(FetchError::AlreadyExists(format!(
                "File `{}` already exists; pass overwrite = true to replace it",
                path.display()
            )));
        }

        self.state.save_file = Some(path);
        Ok(())
    }

    pub fn set_cookie_jar_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = Self::expand_argument(path.as_ref(), "set_cookie_jar_path")?;
        FileUtils::check_parent_writable(&path)?;
        self.state.cookie_jar = path;
        Ok(())
    }

    /// Add or replace a transfer option; returns the replaced option.
    pub fn set_option(&mut self, option: TransferOption) -> Result<Option<TransferOption>> {
        option.validate()?;
        Ok(self.state.options.set(option))
    }

    /// Add an option by name, see [`TransferOption::parse`].
    pub fn set_option_raw(
        &mut self,
        name: &str,
        value: &str,
    ) -> Result<Option<TransferOption>> {
        let option = TransferOption::parse(name, value)?;
        Ok(self.state.options.set(option))
    }

    /// Remove an option; returns it if it was set.
    pub fn unset_option(&mut self, key: &OptionKey) -> Result<Option<TransferOption>> {
        key.validate()?;
        Ok(self.state.options.remove(key))
    }

    /// Assemble the outbound request without performing it.
    pub fn prepare(&self, url: &str, use_cookies: bool) -> Result<TransferRequest> {
        if url.trim().is_empty() {
            return Err(FetchError::InvalidArgument(
                "fetch expects a url to fetch".to_string(),
            ));
        }

        let mut request = TransferRequest::new(url.trim());
        request.set_header(
            "User-Agent",
            format!("{} / {}", self.state.user_agent, RUNTIME_VERSION),
        );

        if !self.state.post_fields.is_empty() {
            request.method = HttpMethod::Post;
            request.body = Some(RequestBody::form(&self.state.post_fields));
        }

        if use_cookies {
            request.cookie_jar = Some(CookieJarPaths {
                read: self.state.cookie_jar.clone(),
                write: self.state.cookie_jar.clone(),
            });
        }

        request.return_body = true;
        self.state.options.apply_all(&mut request);
        Ok(request)
    }

    /// Perform the request and return the body as text.
    pub fn fetch(&mut self, url: &str, use_cookies: bool, reset_after: bool) -> Result<String> {
        self.fetch_response(url, use_cookies, reset_after)
            .map(|response| response.text())
    }

    /// Perform the request and return the full response.
    ///
    /// The body is written to the save location when one is set. With
    /// `reset_after` the POST fields and save location are cleared, whether
    /// or not the transfer succeeded.
    pub fn fetch_response(
        &mut self,
        url: &str,
        use_cookies: bool,
        reset_after: bool,
    ) -> Result<TransferResponse> {
        let request = self.prepare(url, use_cookies)?;
        debug!(
            "fetching {} {} (cookies: {}, options: {})",
            request.method,
            request.url,
            use_cookies,
            self.state.options.len()
        );

        let result = self.transport.perform(&request);

        let outcome = result.and_then(|response| {
            if let Some(path) = &self.state.save_file {
                OutputWriter::new(Some(path.clone())).write(&response.body)?;
                info!("saved {} bytes to {}", response.body.len(), path.display());
            }
            Ok(response)
        });

        if reset_after {
            self.state.post_fields.clear();
            self.state.save_file = None;
        }

        outcome
    }

    /// Restore the construction-time configuration and drop all other state.
    pub fn reset(&mut self) {
        self.state = RequestState::from_config(&self.defaults);
    }

    fn expand_argument(path: &Path, operation: &str) -> Result<PathBuf> {
        let raw = path.to_string_lossy();
        if raw.trim().is_empty() {
            return Err(FetchError::InvalidArgument(format!(
                "{} expects a file path",
                operation
            )));
        }
        FileUtils::expand_path(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Records requests; echoes the request body or returns a fixed body.
    #[derive(Default)]
    struct StubTransport {
        requests: RefCell<Vec<TransferRequest>>,
        reply: Option<String>,
        fail: bool,
    }

    impl StubTransport {
        fn replying(body: &str) -> Self {
            Self {
                reply: Some(body.to_string()),
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn last(&self) -> TransferRequest {
            self.requests.borrow().last().cloned().expect("a request")
        }
    }

    impl Transport for StubTransport {
        fn perform(&self, request: &TransferRequest) -> Result<TransferResponse> {
            self.requests.borrow_mut().push(request.clone());
            if self.fail {
                return Err(FetchError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )));
            }
            let body = match &self.reply {
                Some(reply) => reply.clone().into_bytes(),
                None => request.body.as_ref().map(|b| b.data.clone()).unwrap_or_default(),
            };
            Ok(TransferResponse::new(200, body))
        }
    }

    fn fetcher() -> Fetcher<StubTransport> {
        crate::logging::try_init_for_tests();
        Fetcher::with_transport(StubTransport::default())
    }

    #[test]
    fn single_field_then_merge_keeps_both_keys() {
        let mut fetcher = fetcher();
        let stored = fetcher.set_post_field("user", "alice").expect("field");
        assert_eq!(stored, "alice");

        let merged = fetcher
            .set_post_data([("token", "t1"), ("user", "bob")])
            .expect("merge");
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("user").map(String::as_str), Some("bob"));
        assert_eq!(merged.get("token").map(String::as_str), Some("t1"));
    }

    #[test]
    fn empty_post_data_is_invalid() {
        let mut fetcher = fetcher();
        let err = fetcher
            .set_post_data(Vec::<(String, String)>::new())
            .expect_err("empty");
        assert!(matches!(err, FetchError::InvalidArgument(_)));
        assert!(fetcher.post_fields().is_empty());
    }

    #[test]
    fn user_agent_is_validated_and_prefixes_header() {
        let mut fetcher = fetcher();
        assert!(matches!(
            fetcher.set_user_agent(""),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(matches!(
            fetcher.set_user_agent("bad\nagent"),
            Err(FetchError::InvalidArgument(_))
        ));

        fetcher.set_user_agent("X").expect("agent");
        fetcher.fetch("http://example.test/", false, true).expect("fetch");
        let request = fetcher.transport().last();
        let agent = request.header("User-Agent").expect("user agent");
        assert!(agent.starts_with("X"));
        assert_eq!(agent, format!("X / {}", RUNTIME_VERSION));
    }

    #[test]
    fn save_location_requires_existing_parent_regardless_of_overwrite() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("missing/out.txt");
        let mut fetcher = fetcher();
        for overwrite in [false, true] {
            let err = fetcher
                .set_save_location(&missing, overwrite)
                .expect_err("missing parent");
            assert!(matches!(err, FetchError::NotFound(_)));
        }
        assert!(fetcher.save_location().is_none());
    }

    #[test]
    fn existing_save_file_needs_overwrite() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("page.html");
        fs::write(&path, "old").expect("seed");
        let mut fetcher = fetcher();

        let err = fetcher
            .set_save_location(&path, false)
            .expect_err("exists");
        assert!(matches!(err, FetchError::AlreadyExists(_)));

        fetcher.set_save_location(&path, true).expect("overwrite");
        assert_eq!(fetcher.save_location(), Some(path.as_path()));
    }

    #[test]
    fn save_location_rejects_empty_and_directories() {
        let temp = tempdir().expect("tempdir");
        let mut fetcher = fetcher();
        assert!(matches!(
            fetcher.set_save_location("", false),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(matches!(
            fetcher.set_save_location(temp.path(), true),
            Err(FetchError::InvalidArgument(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_directory_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("tempdir");
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).expect("mkdir");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).expect("chmod");

        // root ignores mode bits
        if tempfile::tempfile_in(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod");
            return;
        }

        let mut fetcher = fetcher();
        let err = fetcher
            .set_save_location(locked.join("out.txt"), false)
            .expect_err("locked");
        assert!(matches!(err, FetchError::PermissionDenied(_)));
        let err = fetcher
            .set_cookie_jar_path(locked.join("jar.txt"))
            .expect_err("locked");
        assert!(matches!(err, FetchError::PermissionDenied(_)));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod");
    }

    #[test]
    fn cookie_jar_path_is_validated() {
        let temp = tempdir().expect("tempdir");
        let mut fetcher = fetcher();
        let default_jar = fetcher.cookie_jar_path().to_path_buf();

        assert!(matches!(
            fetcher.set_cookie_jar_path(""),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(matches!(
            fetcher.set_cookie_jar_path(temp.path().join("nope/jar.txt")),
            Err(FetchError::NotFound(_))
        ));
        assert_eq!(fetcher.cookie_jar_path(), default_jar);

        let jar = temp.path().join("jar.txt");
        fetcher.set_cookie_jar_path(&jar).expect("jar");
        assert_eq!(fetcher.cookie_jar_path(), jar);
    }

    #[test]
    fn fetch_with_reset_clears_transient_state_only() {
        let temp = tempdir().expect("tempdir");
        let mut fetcher = fetcher();
        fetcher.set_user_agent("keeper").expect("agent");
        fetcher.set_post_field("a", "1").expect("field");
        fetcher
            .set_option(TransferOption::Timeout(Duration::from_secs(3)))
            .expect("option");
        fetcher
            .set_save_location(temp.path().join("out.txt"), false)
            .expect("save");
        let options_before = fetcher.options().clone();

        fetcher.fetch("http://example.test/", false, true).expect("fetch");

        assert!(fetcher.post_fields().is_empty());
        assert!(fetcher.save_location().is_none());
        assert_eq!(fetcher.user_agent(), "keeper");
        assert_eq!(fetcher.options(), &options_before);
    }

    #[test]
    fn fetch_without_reset_keeps_post_fields() {
        let mut fetcher = fetcher();
        fetcher.set_post_field("a", "1").expect("field");
        fetcher.fetch("http://example.test/", false, false).expect("fetch");
        assert_eq!(fetcher.post_fields().get("a").map(String::as_str), Some("1"));

        fetcher.fetch("http://example.test/", false, false).expect("again");
        assert_eq!(fetcher.transport().requests.borrow().len(), 2);
        assert_eq!(fetcher.transport().last().body_text().as_deref(), Some("a=1"));
    }

    #[test]
    fn reset_restores_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = Config {
            user_agent: "initial".to_string(),
            cookie_jar: temp.path().join("default-jar.txt"),
        };
        let mut fetcher = Fetcher::with_transport_and_config(StubTransport::default(), config);
        let pristine = fetcher.state().clone();

        fetcher.set_user_agent("changed").expect("agent");
        fetcher
            .set_cookie_jar_path(temp.path().join("other.txt"))
            .expect("jar");
        fetcher.set_post_field("k", "v").expect("field");
        fetcher
            .set_save_location(temp.path().join("out.txt"), false)
            .expect("save");
        fetcher
            .set_option_raw("CURLOPT_FOLLOWLOCATION", "1")
            .expect("option");

        fetcher.reset();
        assert_eq!(fetcher.state(), &pristine);
        assert_eq!(fetcher.user_agent(), "initial");
        assert!(fetcher.options().is_empty());
    }

    #[test]
    fn posted_form_is_echoed() {
        let mut fetcher = fetcher();
        fetcher.set_post_data([("a", "1")]).expect("data");
        fetcher.set_post_field("note", "x & y").expect("field");
        let body = fetcher.fetch("http://example.test/echo", false, true).expect("fetch");
        assert_eq!(body, "a=1&note=x+%26+y");

        let request = fetcher.transport().last();
        let fields = request.form_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("note").map(String::as_str), Some("x & y"));
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.body.and_then(|b| b.content_type).as_deref(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn body_is_saved_to_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("hello.txt");
        let mut fetcher = Fetcher::with_transport(StubTransport::replying("hello"));
        fetcher.set_save_location(&path, false).expect("save");

        let body = fetcher.fetch("http://example.test/hello", false, true).expect("fetch");
        assert_eq!(body, "hello");
        assert_eq!(fs::read_to_string(&path).expect("read"), "hello");
    }

    #[test]
    fn prepare_applies_defaults_then_options() {
        let mut fetcher = fetcher();
        let request = fetcher.prepare("http://example.test/", false).expect("prepare");
        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.body.is_none());
        assert!(request.cookie_jar.is_none());
        assert!(request.return_body);

        fetcher.set_post_field("a", "1").expect("field");
        fetcher
            .set_option(TransferOption::UserAgent("raw-agent".to_string()))
            .expect("agent");
        fetcher
            .set_option(TransferOption::Method(HttpMethod::Put))
            .expect("method");
        fetcher
            .set_option(TransferOption::ReturnTransfer(false))
            .expect("return");
        let request = fetcher.prepare("http://example.test/", true).expect("prepare");
        assert_eq!(request.header("user-agent"), Some("raw-agent"));
        assert_eq!(request.method, HttpMethod::Put);
        assert!(!request.return_body);
        let jar = request.cookie_jar.expect("jar paths");
        assert_eq!(jar.read, fetcher.cookie_jar_path());
        assert_eq!(jar.write, fetcher.cookie_jar_path());
    }

    #[test]
    fn empty_url_fails_before_transport() {
        let mut fetcher = fetcher();
        fetcher.set_post_field("a", "1").expect("field");
        let err = fetcher.fetch("  ", false, true).expect_err("empty url");
        assert!(matches!(err, FetchError::InvalidArgument(_)));
        assert!(fetcher.transport().requests.borrow().is_empty());
        assert_eq!(fetcher.post_fields().len(), 1);
    }

    #[test]
    fn transfer_failure_is_surfaced_and_still_resets() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("never.txt");
        let mut fetcher = Fetcher::with_transport(StubTransport::failing());
        fetcher.set_post_field("a", "1").expect("field");
        fetcher.set_save_location(&path, false).expect("save");

        let err = fetcher
            .fetch("http://unreachable.test/", false, true)
            .expect_err("transfer failure");
        assert!(matches!(err, FetchError::Io(_)));
        assert!(!path.exists());
        assert!(fetcher.post_fields().is_empty());
        assert!(fetcher.save_location().is_none());
    }

    #[test]
    fn option_setters_reject_empty_input() {
        let mut fetcher = fetcher();
        assert!(matches!(
            fetcher.set_option_raw("", "1"),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(matches!(
            fetcher.set_option_raw("CURLOPT_TIMEOUT", ""),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(matches!(
            fetcher.set_option(TransferOption::Proxy(String::new())),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(matches!(
            fetcher.unset_option(&OptionKey::custom("")),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(fetcher.options().is_empty());
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let mut fetcher = fetcher();
        assert!(matches!(
            fetcher.set_option_raw("timeout", "5124095576040000h"),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(fetcher.options().is_empty());
    }

    #[test]
    fn unset_option_removes_entry() {
        let mut fetcher = fetcher();
        fetcher.set_option_raw("timeout", "10").expect("timeout");
        let replaced = fetcher.set_option_raw("CURLOPT_TIMEOUT", "20").expect("timeout");
        assert_eq!(
            replaced,
            Some(TransferOption::Timeout(Duration::from_secs(10)))
        );

        let removed = fetcher.unset_option(&OptionKey::Timeout).expect("unset");
        assert_eq!(removed, Some(TransferOption::Timeout(Duration::from_secs(20))));
        assert_eq!(fetcher.unset_option(&OptionKey::Timeout).expect("unset"), None);
        assert!(fetcher.prepare("http://example.test/", false).expect("prepare").timeout.is_none());
    }
}
