//! SSL/TLS configuration and utilities

use crate::error::{FetchError, Result};
use crate::http::request::TransferRequest;
use reqwest::ClientBuilder;
use std::path::Path;

/// SSL/TLS certificate utilities
pub struct SslUtils;

impl SslUtils {
    /// Validate the TLS settings of a request
    pub fn validate(request: &TransferRequest) -> Result<()> {
        if let Some(ca_cert) = &request.ca_certificate {
            if !ca_cert.is_file() {
                return Err(FetchError::NotFound(format!(
                    "CA certificate file not found: {:?}",
                    ca_cert
                )));
            }
        }
        Ok(())
    }

    /// Apply peer verification and CA bundle settings to a client builder
    pub fn apply(mut builder: ClientBuilder, request: &TransferRequest) -> Result<ClientBuilder> {
        Self::validate(request)?;

        if !request.verify_peer {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_cert) = &request.ca_certificate {
            let pem = Self::read_cert_file(ca_cert)?;
            let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                FetchError::Ssl(format!("Invalid CA certificate {:?}: {}", ca_cert, e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        Ok(builder)
    }

    /// Read certificate file contents
    pub fn read_cert_file(path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(FetchError::Io)
    }
}
