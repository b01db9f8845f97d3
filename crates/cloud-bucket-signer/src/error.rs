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

use thiserror::Error;

/// Result type for URL signing
pub type SignResult<T> = Result<T, SignError>;

/// Errors raised while signing URLs
#[derive(Error, Debug)]
pub enum SignError {
    /// The scheme tag names no known signing scheme
    #[error("URL signing does not support scheme '{0}'")]
    UnsupportedSigningScheme(String),

    /// The key could not be parsed or decoded
    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    /// The cryptographic signature could not be produced
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The policy document could not be encoded
    #[error("Encoding failed: {0}")]
    Encoding(String),
}
