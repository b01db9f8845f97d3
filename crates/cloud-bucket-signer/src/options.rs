// Cloud Bucket - uniform object storage access
// Copyright (C) 2025 Cloud Bucket Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Signing scheme selection and per-request options

use crate::error::SignError;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How a URL gets signed
///
/// Parsed from the backend tag the URL belongs to:
///
/// | Tag              | Scheme        |
/// |------------------|---------------|
/// | `s3`             | `Policy`      |
/// | `gs`             | `Hmac`        |
/// | `minio`, `none`  | `Passthrough` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningScheme {
    /// CloudFront-style custom policy signed with RSA-SHA1
    Policy,
    /// Cloud CDN-style HMAC-SHA1 over the URL
    Hmac,
    /// URLs are returned unchanged
    Passthrough,
}

impl SigningScheme {
    /// Backend tag of the scheme
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningScheme::Policy => "s3",
            SigningScheme::Hmac => "gs",
            SigningScheme::Passthrough => "none",
        }
    }
}

impl FromStr for SigningScheme {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s3" => Ok(SigningScheme::Policy),
            "gs" => Ok(SigningScheme::Hmac),
            "minio" | "none" => Ok(SigningScheme::Passthrough),
            other => Err(SignError::UnsupportedSigningScheme(other.to_string())),
        }
    }
}

impl fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options of one signing request
#[derive(Clone, PartialEq, Eq)]
pub struct SignUrlOptions {
    /// Signing scheme
    pub scheme: SigningScheme,
    /// Expiry as seconds since the Unix epoch
    pub expires: u64,
    /// Key pair ID (policy) or key name (HMAC)
    pub key_name: String,
    /// PEM private key (policy) or base64 shared secret (HMAC)
    pub key: String,
}

impl SignUrlOptions {
    /// Options expiring one hour from now
    pub fn new(scheme: SigningScheme, key_name: impl Into<String>, key: impl Into<String>) -> Self {
        SignUrlOptions {
            scheme,
            expires: expires_in(Duration::from_secs(3600)),
            key_name: key_name.into(),
            key: key.into(),
        }
    }

    /// Expire at an absolute epoch second
    pub fn expires_at(mut self, epoch_secs: u64) -> Self {
        self.expires = epoch_secs;
        self
    }

    /// Expire `ttl` from now
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.expires = expires_in(ttl);
        self
    }
}

impl fmt::Debug for SignUrlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUrlOptions")
            .field("scheme", &self.scheme)
            .field("expires", &self.expires)
            .field("key_name", &self.key_name)
            .field("key", &"***")
            .finish()
    }
}

/// Epoch second `ttl` from now
pub fn expires_in(ttl: Duration) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now + ttl).as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_from_tag() {
        assert_eq!("s3".parse::<SigningScheme>().unwrap(), SigningScheme::Policy);
        assert_eq!("gs".parse::<SigningScheme>().unwrap(), SigningScheme::Hmac);
        assert_eq!("minio".parse::<SigningScheme>().unwrap(), SigningScheme::Passthrough);
        assert_eq!("none".parse::<SigningScheme>().unwrap(), SigningScheme::Passthrough);
    }

    #[test]
    fn test_unknown_scheme() {
        let err = "azure".parse::<SigningScheme>().unwrap_err();
        assert!(matches!(err, SignError::UnsupportedSigningScheme(ref tag) if tag == "azure"));
    }

    #[test]
    fn test_expires_in_is_in_the_future() {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let expires = expires_in(Duration::from_secs(60));
        assert!(expires >= now + 59 && expires <= now + 61);
    }

    #[test]
    fn test_debug_masks_key() {
        let opts = SignUrlOptions::new(SigningScheme::Hmac, "my-key", "c2VjcmV0");
        let debug = format!("{:?}", opts);
        assert!(debug.contains("my-key"));
        assert!(!debug.contains("c2VjcmV0"));
    }
}
