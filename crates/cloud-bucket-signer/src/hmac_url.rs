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

//! HMAC-SHA1 URL signing (Cloud CDN style)
//!
//! The signed string is the URL with its `Expires` and `KeyName` parameters;
//! the signature is appended as URL-safe base64 without padding. Each URL
//! needs its own signature.

use crate::error::{SignError, SignResult};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::fmt;
use zeroize::Zeroizing;

type HmacSha1 = Hmac<Sha1>;

/// Decoded shared secret
#[derive(Clone)]
pub struct HmacKey {
    secret: Zeroizing<Vec<u8>>,
}

impl HmacKey {
    /// Decode a base64 secret, standard or URL-safe alphabet, padded or not
    pub fn from_base64(key: &str) -> SignResult<Self> {
        let key = key.trim();
        if key.is_empty() {
            return Err(SignError::InvalidKey("HMAC key is empty".to_string()));
        }
        let secret = [STANDARD, URL_SAFE, STANDARD_NO_PAD, URL_SAFE_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(key).ok())
            .ok_or_else(|| SignError::InvalidKey("HMAC key is not valid base64".to_string()))?;
        Ok(HmacKey {
            secret: Zeroizing::new(secret),
        })
    }

    /// Sign `url`, returning it with `Expires`, `KeyName` and `Signature` appended
    pub fn sign_url(&self, url: &str, expires: u64, key_name: &str) -> SignResult<String> {
        let to_sign = format!("{url}?Expires={expires}&KeyName={key_name}");
        let mut mac = HmacSha1::new_from_slice(&self.secret)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        mac.update(to_sign.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{to_sign}&Signature={signature}"))
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacKey")
            .field("len", &self.secret.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZg==";

    #[test]
    fn test_known_signature() {
        let key = HmacKey::from_base64(KEY).unwrap();
        let signed = key
            .sign_url("https://cdn.example.com/videos/a.mp4", 1700000000, "my-key")
            .unwrap();
        assert_eq!(
            signed,
            "https://cdn.example.com/videos/a.mp4?Expires=1700000000&KeyName=my-key&Signature=beUPdp6AbteFcWLDUcYaoWXW5ZU"
        );
    }

    #[test]
    fn test_unpadded_and_url_safe_keys_decode_alike() {
        let padded = HmacKey::from_base64(KEY).unwrap();
        let unpadded = HmacKey::from_base64("MDEyMzQ1Njc4OWFiY2RlZg").unwrap();
        assert_eq!(*padded.secret, *unpadded.secret);
        assert_eq!(padded.secret.as_slice(), b"0123456789abcdef");
    }

    #[test]
    fn test_invalid_key() {
        assert!(matches!(HmacKey::from_base64(""), Err(SignError::InvalidKey(_))));
        assert!(matches!(HmacKey::from_base64("!!not base64!!"), Err(SignError::InvalidKey(_))));
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = HmacKey::from_base64(KEY).unwrap();
        assert_eq!(format!("{:?}", key), "HmacKey { len: 16 }");
    }
}
