//! GitHub webhook support: signature validation and branch filters.

use hmac::{Hmac, Mac};
use regex::Regex;
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Body of the `create` and `delete` webhook events.
#[derive(Debug, Clone, Deserialize)]
pub struct RefEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_type: String,
    pub repository: RefEventRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefEventRepository {
    pub name: String,
}

impl RefEvent {
    pub fn is_branch(&self) -> bool {
        self.ref_type == "branch"
    }
}

/// Validate a GitHub webhook signature (X-Hub-Signature-256).
pub fn validate_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        tracing::warn!("Webhook secret not configured, skipping validation");
        return true;
    }

    let Some(sig) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);

    mac.verify_slice(&sig_bytes).is_ok()
}

/// True when any filter matches the branch. Filters are unanchored regexes.
pub fn matches_filters(filters: &[String], branch: &str) -> Result<bool, regex::Error> {
    for filter in filters {
        if Regex::new(filter)?.is_match(branch) {
            return Ok(true);
        }
    }
    Ok(false)
}
