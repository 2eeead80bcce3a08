//! Signed-file envelope.
//!
//! Every persisted document is wrapped in an envelope carrying the signer's
//! public key and a signature over the payload. Producing and checking
//! signatures is delegated to [`Signer`] and [`SignatureVerifier`]; this
//! module only shapes the envelope and passes `fileData` through unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Only payload encoding the store writes.
pub const FILE_TYPE_JSON: &str = "json";

/// Envelope before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedFile {
    pub file_data: String,
    pub file_type: String,
    pub public_key: String,
    pub is_encrypted: bool,
    /// RFC 3339 creation time.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl UnsignedFile {
    /// Unencrypted JSON payload stamped with the current UTC time.
    #[must_use]
    pub fn json(file_data: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            file_data: file_data.into(),
            file_type: FILE_TYPE_JSON.to_string(),
            public_key: public_key.into(),
            is_encrypted: false,
            timestamp: timestamp_rfc3339(),
            file_name: None,
        }
    }

    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Attach a signature.
    #[must_use]
    pub fn into_signed(self, signature: impl Into<String>) -> SignedFile {
        SignedFile {
            file_data: self.file_data,
            file_type: self.file_type,
            public_key: self.public_key,
            is_encrypted: self.is_encrypted,
            timestamp: self.timestamp,
            signature: signature.into(),
            file_name: self.file_name,
        }
    }
}

/// Envelope as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedFile {
    pub file_data: String,
    pub file_type: String,
    pub public_key: String,
    pub is_encrypted: bool,
    pub timestamp: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl SignedFile {
    /// The envelope without its signature, as it was signed.
    #[must_use]
    pub fn unsigned(&self) -> UnsignedFile {
        UnsignedFile {
            file_data: self.file_data.clone(),
            file_type: self.file_type.clone(),
            public_key: self.public_key.clone(),
            is_encrypted: self.is_encrypted,
            timestamp: self.timestamp.clone(),
            file_name: self.file_name.clone(),
        }
    }

    /// Parsed creation time, if the timestamp is well formed.
    #[must_use]
    pub fn created_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.timestamp, &Rfc3339).ok()
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Signing failed (key unavailable, user declined, provider error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignError(pub String);

impl fmt::Display for SignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signing failed: {}", self.0)
    }
}

impl std::error::Error for SignError {}

/// Produces signatures with the current identity's private key.
pub trait Signer: Send + Sync {
    /// Public key envelopes are stamped with.
    fn public_key(&self) -> &str;

    fn sign(&self, file: UnsignedFile) -> Result<SignedFile, SignError>;
}

/// Checks envelope signatures. The verdict is authoritative.
pub trait SignatureVerifier: Send + Sync {
    fn validate_signable(&self, file: &SignedFile) -> bool;
}

pub(crate) fn timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
