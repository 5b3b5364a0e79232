//! Agent identities.

use crate::vocab::foaf;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// An agent's WebID.
///
/// Identities are opaque: two agents are the same iff their strings are
/// byte-for-byte equal. No URI normalization happens here, so
/// `https://a.example/profile#me` and `HTTPS://a.example/profile#me` are
/// different agents as far as every backend is concerned.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WebId(String);

impl WebId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        WebId(id.into())
    }

    /// The well-known identity standing for "anyone", authenticated or not.
    pub fn public() -> Self {
        WebId(foaf::AGENT.to_string())
    }

    pub fn is_public(&self) -> bool {
        self.0 == foaf::AGENT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WebId {
    fn from(id: &str) -> Self {
        WebId::new(id)
    }
}

impl From<String> for WebId {
    fn from(id: String) -> Self {
        WebId(id)
    }
}

impl AsRef<str> for WebId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
