//! The DID codec: deterministic, invertible mapping between raw public-key
//! bytes, their base64url text form, and the `did:hyp:<key>` identifier.
//!
//! Validity is purely syntactic. A parseable DID says nothing about whether
//! the corresponding log exists anywhere.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::PublicKey;
use crate::error::DidError;

/// The method prefix every hypdid identifier starts with.
pub const DID_PREFIX: &str = "did:hyp:";

/// Length of a base64url-encoded 32-byte key, unpadded.
pub const ENCODED_KEY_LEN: usize = 43;

/// Encode raw public-key bytes as unpadded base64url text.
pub fn encode_key(key: &PublicKey) -> String {
    URL_SAFE_NO_PAD.encode(key.as_bytes())
}

/// Decode base64url text back to public-key bytes.
pub fn decode_key(text: &str) -> Result<PublicKey, DidError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| DidError::InvalidKeyEncoding(e.to_string()))?;
    let raw: [u8; 32] = bytes
        .try_into()
        .map_err(|v: Vec<u8>| DidError::InvalidKeyLength(v.len()))?;
    Ok(PublicKey(raw))
}

/// A decentralized identifier bound one-to-one to a public key.
///
/// Always has the shape `did:hyp:` followed by exactly 43 base64url
/// characters. Construct via [`Did::from_key`] or [`Did::parse`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did {
    text: String,
    key: PublicKey,
}

impl Did {
    /// Build the DID for a public key.
    pub fn from_key(key: &PublicKey) -> Self {
        Self {
            text: format!("{DID_PREFIX}{}", encode_key(key)),
            key: *key,
        }
    }

    /// Parse and validate a DID string.
    pub fn parse(s: &str) -> Result<Self, DidError> {
        let encoded = s
            .strip_prefix(DID_PREFIX)
            .ok_or_else(|| DidError::InvalidDidFormat(s.to_string()))?;
        if encoded.len() != ENCODED_KEY_LEN
            || !encoded
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(DidError::InvalidDidFormat(s.to_string()));
        }
        let key = decode_key(encoded).map_err(|_| DidError::InvalidDidFormat(s.to_string()))?;
        Ok(Self {
            text: s.to_string(),
            key,
        })
    }

    /// The public key this identifier is bound to.
    pub fn public_key(&self) -> PublicKey {
        self.key
    }

    /// The full identifier string.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The base64url-encoded key portion.
    pub fn encoded_key(&self) -> &str {
        &self.text[DID_PREFIX.len()..]
    }
}

impl fmt::Debug for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did({})", self.text)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl std::str::FromStr for Did {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Did {
    type Error = DidError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.text
    }
}
