//! easyfetch - a stateful request builder for single synchronous fetches
//!
//! Configure a [`Fetcher`] incrementally (user agent, POST fields, cookie
//! jar, save location, transfer options) and call [`Fetcher::fetch`] to run
//! one blocking request through a [`Transport`]. The default transport is a
//! reqwest-based [`HttpClient`].
//!
//! ```no_run
//! use easyfetch::Fetcher;
//!
//! let mut fetcher = Fetcher::new()?;
//! fetcher.set_post_data([("q", "rust")])?;
//! let body = fetcher.fetch("https://example.com/search", false, true)?;
//! println!("{}", body);
//! # Ok::<(), easyfetch::FetchError>(())
//! ```

pub mod config;
pub mod cookies;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod logging;
pub mod output;
pub mod ssl;
pub mod utils;

pub use config::{Config, HttpMethod};
pub use error::{FetchError, Result};
pub use fetcher::{Fetcher, RequestState};
pub use http::{
    HttpClient, OptionKey, TransferOption, TransferOptions, TransferRequest, TransferResponse,
    Transport,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
