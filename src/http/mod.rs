//! HTTP transfer engine
//!
//! The [`Transport`] trait is the seam between the request-shaping
//! [`Fetcher`](crate::Fetcher) and whatever performs the network exchange.
//! [`HttpClient`] is the default engine, built on reqwest.

use std::sync::Arc;

use crate::config::HttpMethod;
use crate::cookies::{CookieJar, SharedJar};
use crate::error::{FetchError, Result};
use crate::output::OutputWriter;
use crate::ssl::SslUtils;
use crate::utils::UrlUtils;
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, Method};
use tokio::runtime::Runtime;
use url::Url;

pub mod auth;
pub mod options;
pub mod request;
pub mod response;

pub use options::{OptionKey, TransferOption, TransferOptions};
pub use request::{CookieJarPaths, RedirectPolicy, RequestBody, TransferRequest};
pub use response::TransferResponse;

/// Performs one blocking request/response exchange.
pub trait Transport {
    fn perform(&self, request: &TransferRequest) -> Result<TransferResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn perform(&self, request: &TransferRequest) -> Result<TransferResponse> {
        (**self).perform(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn perform(&self, request: &TransferRequest) -> Result<TransferResponse> {
        (**self).perform(request)
    }
}

/// reqwest-backed transfer engine
///
/// Drives async reqwest on a private current-thread runtime, so
/// [`perform`](Transport::perform) must not be called from inside another
/// async runtime.
pub struct HttpClient {
    runtime: Runtime,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FetchError::Config(format!("Failed to create async runtime: {}", e)))?;
        Ok(Self { runtime })
    }
}

impl Transport for HttpClient {
    fn perform(&self, request: &TransferRequest) -> Result<TransferResponse> {
        self.runtime.block_on(execute(request))
    }
}

fn build_client(request: &TransferRequest, jar: Option<Arc<SharedJar>>) -> Result<Client> {
    let mut builder = ClientBuilder::new().redirect(if request.redirects.follow {
        reqwest::redirect::Policy::limited(request.redirects.max as usize)
    } else {
        reqwest::redirect::Policy::none()
    });

    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }

    if let Some(timeout) = request.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(connect_timeout) = request.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }

    // Configure proxy if specified
    if let Some(proxy_url) = &request.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| FetchError::Proxy(format!("Invalid proxy: {}", e)))?;
        builder = builder.proxy(proxy);
    }

    builder = SslUtils::apply(builder, request)?;

    builder.build().map_err(FetchError::Http)
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Trace => Method::TRACE,
    }
}

/// Load the jar files for one transfer
fn open_jar(paths: &CookieJarPaths, url: &Url, existing: Option<&str>) -> Result<SharedJar> {
    let mut jar = SharedJar::new(CookieJar::load(&paths.read)?);
    if paths.write != paths.read {
        jar = jar.with_target(CookieJar::load(&paths.write)?);
    }
    if let Some(existing) = existing {
        jar = jar.with_request_cookies(url, existing);
    }
    Ok(jar)
}

async fn execute(request: &TransferRequest) -> Result<TransferResponse> {
    let url = UrlUtils::validate_url(&request.url)?;
    let jar = match &request.cookie_jar {
        Some(paths) => Some(Arc::new(open_jar(paths, &url, request.header("cookie"))?)),
        None => None,
    };
    let client = build_client(request, jar.clone())?;

    let mut builder = client.request(to_reqwest_method(request.method), url.clone());

    for (key, value) in &request.headers {
        // The jar sends the caller's Cookie header itself
        if jar.is_some() && key.eq_ignore_ascii_case("cookie") {
            continue;
        }
        builder = builder.header(key.as_str(), value.as_str());
    }

    if let Some(body) = &request.body {
        if let (Some(content_type), None) = (&body.content_type, request.header("content-type")) {
            builder = builder.header(CONTENT_TYPE, content_type.as_str());
        }
        builder = builder.body(body.data.clone());
    }

    for (name, value) in &request.custom {
        warn!("ignoring unsupported transfer option {}={}", name, value);
    }

    let outbound = builder.build().map_err(FetchError::Http)?;
    log_request(&outbound);

    let response = client.execute(outbound).await.map_err(FetchError::Http)?;
    let status = response.status().as_u16();
    let final_url = response.url().clone();
    debug!("< {:?} {}", response.version(), response.status());

    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    if let (Some(paths), Some(jar)) = (&request.cookie_jar, &jar) {
        jar.snapshot().save(&paths.write)?;
    }

    let mut body = response.bytes().await.map_err(FetchError::Http)?.to_vec();
    debug!("< {} bytes from {}", body.len(), final_url);

    if !request.return_body {
        OutputWriter::stdout().write(&body)?;
        body.clear();
    }

    Ok(TransferResponse {
        status,
        headers,
        body,
    })
}

fn log_request(request: &reqwest::Request) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    debug!("> {} {}", request.method(), request_path(request.url()));
    for (name, value) in request.headers().iter() {
        let value = value.to_str().unwrap_or("<non-utf8>");
        debug!("> {}: {}", name, value);
    }
}

fn request_path(url: &Url) -> String {
    match url[url::Position::BeforePath..].trim() {
        "" => "/".to_string(),
        path => path.to_string(),
    }
}
