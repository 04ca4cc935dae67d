//! HTTP authentication utilities

use crate::error::{FetchError, Result};
use base64::Engine;

/// Authentication helper
pub struct Auth;

impl Auth {
    /// Create basic auth header value
    pub fn basic_auth(username: &str, password: &str) -> String {
        let credentials = format!("{}:{}", username, password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {}", encoded)
    }

    /// Parse user:password format
    pub fn parse_user_pass(input: &str) -> Result<(String, String)> {
        let parts: Vec<&str> = input.splitn(2, ':').collect();
        match parts.as_slice() {
            [user, _] | [user] if user.is_empty() => Err(FetchError::InvalidArgument(
                "Invalid user:password format: empty user".to_string(),
            )),
            [user, pass] => Ok((user.to_string(), pass.to_string())),
            [user] => Ok((user.to_string(), String::new())),
            _ => Err(FetchError::InvalidArgument(
                "Invalid user:password format".to_string(),
            )),
        }
    }
}
