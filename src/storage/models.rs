use serde::{Deserialize, Serialize};

/// 短链接映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPair {
    pub owner_id: String,
    pub short_code: String,
    pub original_url: String,
}

impl UrlPair {
    pub fn new(
        owner_id: impl Into<String>,
        short_code: impl Into<String>,
        original_url: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            short_code: short_code.into(),
            original_url: original_url.into(),
        }
    }
}

/// A single "delete this code on behalf of this owner" item travelling
/// through the deletion pipeline. Never persisted as a record of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub owner_id: String,
    pub short_code: String,
}

impl DeletionRequest {
    pub fn new(owner_id: impl Into<String>, short_code: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            short_code: short_code.into(),
        }
    }
}
