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

//! Reusable signer for many URLs below one base
//!
//! Keys are parsed once at construction. With the policy scheme and a base
//! ending in `*`, the policy is signed once for the wildcard resource and
//! every later URL reuses that query string, so signing N paths costs one
//! RSA operation instead of N.

use crate::error::SignResult;
use crate::hmac_url::HmacKey;
use crate::options::{SignUrlOptions, SigningScheme};
use crate::policy::PolicyKey;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Wildcard marker ending a base URL
pub const WILDCARD: char = '*';

#[derive(Debug)]
enum Mode {
    /// Query string signed once for the wildcard resource
    Shared { query: String },
    Policy {
        key: PolicyKey,
        expires: u64,
        key_pair_id: String,
    },
    Hmac {
        key: HmacKey,
        expires: u64,
        key_name: String,
    },
    Passthrough,
}

/// Signs `base + suffix` URLs with fixed options
///
/// `Send + Sync`; share it behind an `Arc` to sign from several tasks.
#[derive(Debug)]
pub struct UrlSigner {
    prefix: String,
    scheme: SigningScheme,
    mode: Mode,
    signatures: AtomicU64,
}

impl UrlSigner {
    /// Prepare a signer for URLs starting with `base`
    ///
    /// A trailing `*` on `base` is stripped from the produced URLs.
    pub fn new(base: &str, opts: &SignUrlOptions) -> SignResult<Self> {
        let wildcard = base.ends_with(WILDCARD);
        let prefix = base.strip_suffix(WILDCARD).unwrap_or(base).to_string();
        let mut signatures = 0;

        let mode = match opts.scheme {
            SigningScheme::Policy => {
                let key = PolicyKey::from_pem(&opts.key)?;
                if wildcard {
                    signatures += 1;
                    Mode::Shared {
                        query: key.query(base, opts.expires, &opts.key_name)?,
                    }
                } else {
                    Mode::Policy {
                        key,
                        expires: opts.expires,
                        key_pair_id: opts.key_name.clone(),
                    }
                }
            }
            SigningScheme::Hmac => Mode::Hmac {
                key: HmacKey::from_base64(&opts.key)?,
                expires: opts.expires,
                key_name: opts.key_name.clone(),
            },
            SigningScheme::Passthrough => Mode::Passthrough,
        };

        debug!(
            scheme = %opts.scheme,
            base = %base,
            shared = matches!(mode, Mode::Shared { .. }),
            "Created URL signer"
        );

        Ok(UrlSigner {
            prefix,
            scheme: opts.scheme,
            mode,
            signatures: AtomicU64::new(signatures),
        })
    }

    /// Signed URL of `prefix + suffix`
    pub fn sign(&self, suffix: &str) -> SignResult<String> {
        let url = format!("{}{suffix}", self.prefix);
        match &self.mode {
            Mode::Shared { query } => Ok(format!("{url}?{query}")),
            Mode::Policy {
                key,
                expires,
                key_pair_id,
            } => {
                let query = key.query(&url, *expires, key_pair_id)?;
                self.signatures.fetch_add(1, Ordering::Relaxed);
                Ok(format!("{url}?{query}"))
            }
            Mode::Hmac {
                key,
                expires,
                key_name,
            } => {
                let signed = key.sign_url(&url, *expires, key_name)?;
                self.signatures.fetch_add(1, Ordering::Relaxed);
                Ok(signed)
            }
            Mode::Passthrough => Ok(url),
        }
    }

    /// Cryptographic signatures produced so far, including at construction
    pub fn signatures_computed(&self) -> u64 {
        self.signatures.load(Ordering::Relaxed)
    }

    /// Base URL without the wildcard marker
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Signing scheme
    pub fn scheme(&self) -> SigningScheme {
        self.scheme
    }
}
