//! Client configuration.

use podgate_core::agent::WebId;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How to reach a pod, and as whom.
///
/// Only `web_id` is required when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// The acting agent. Becomes the owner of newly created ACL documents.
    pub web_id: WebId,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Sent as `Authorization: Bearer …` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl HttpConfig {
    pub fn new(web_id: WebId) -> Self {
        HttpConfig {
            web_id,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            bearer_token: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("podgate/{}", env!("CARGO_PKG_VERSION"))
}
