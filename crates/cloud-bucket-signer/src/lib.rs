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

//! Time-limited signed URLs for CDN-fronted buckets
//!
//! Two schemes are supported:
//! - **Policy** (`s3`): CloudFront custom policy, RSA-SHA1 with a PEM key pair
//! - **HMAC** (`gs`): Cloud CDN signed URL, HMAC-SHA1 with a base64 shared key
//!
//! MinIO has no CDN signing; its URLs pass through unchanged.
//!
//! # Examples
//!
//! ```no_run
//! use cloud_bucket_signer::{sign_url, url_signer, SignUrlOptions, SigningScheme};
//! use std::time::Duration;
//!
//! # fn main() -> cloud_bucket_signer::SignResult<()> {
//! let opts = SignUrlOptions::new(SigningScheme::Hmac, "my-key", "MDEyMzQ1Njc4OWFiY2RlZg==")
//!     .expires_in(Duration::from_secs(600));
//! let url = sign_url("https://cdn.example.com/videos/intro.mp4", &opts)?;
//!
//! // Many files below one directory
//! let signer = url_signer("https://cdn.example.com/videos/*", &opts)?;
//! for name in ["a.mp4", "b.mp4"] {
//!     println!("{}", signer.sign(name)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod hmac_url;
pub mod options;
pub mod policy;
pub mod signer;

pub use error::{SignError, SignResult};
pub use hmac_url::HmacKey;
pub use options::{expires_in, SignUrlOptions, SigningScheme};
pub use policy::PolicyKey;
pub use signer::{UrlSigner, WILDCARD};

/// Sign one URL
pub fn sign_url(url: &str, opts: &SignUrlOptions) -> SignResult<String> {
    match opts.scheme {
        SigningScheme::Policy => {
            let query = PolicyKey::from_pem(&opts.key)?.query(url, opts.expires, &opts.key_name)?;
            Ok(format!("{url}?{query}"))
        }
        SigningScheme::Hmac => {
            HmacKey::from_base64(&opts.key)?.sign_url(url, opts.expires, &opts.key_name)
        }
        SigningScheme::Passthrough => Ok(url.to_string()),
    }
}

/// Signer for many URLs below `base`; see [`UrlSigner`]
pub fn url_signer(base: &str, opts: &SignUrlOptions) -> SignResult<UrlSigner> {
    UrlSigner::new(base, opts)
}
