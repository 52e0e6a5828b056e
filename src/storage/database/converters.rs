use chrono::{DateTime, Utc};

use crate::storage::UrlPair;
use migration::entities::url_pair;

pub fn model_to_pair(model: url_pair::Model) -> UrlPair {
    UrlPair {
        owner_id: model.owner_id,
        short_code: model.short_code,
        original_url: model.original_url,
    }
}

/// 新建记录的 ActiveModel，deleted 始终为 false
pub fn pair_to_active_model(pair: &UrlPair, created_at: DateTime<Utc>) -> url_pair::ActiveModel {
    use sea_orm::ActiveValue::Set;

    url_pair::ActiveModel {
        short_code: Set(pair.short_code.clone()),
        owner_id: Set(pair.owner_id.clone()),
        original_url: Set(pair.original_url.clone()),
        deleted: Set(false),
        created_at: Set(created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    #[test]
    fn test_model_to_pair_drops_storage_columns() {
        let model = url_pair::Model {
            short_code: "abc123".to_string(),
            owner_id: "u1".to_string(),
            original_url: "https://example.com".to_string(),
            deleted: true,
            created_at: Utc::now(),
        };

        let pair = model_to_pair(model);
        assert_eq!(pair, UrlPair::new("u1", "abc123", "https://example.com"));
    }

    #[test]
    fn test_active_model_is_not_deleted() {
        let now = Utc::now();
        let active = pair_to_active_model(&UrlPair::new("u1", "xyz", "https://t.com"), now);

        assert!(matches!(active.deleted, ActiveValue::Set(false)));
        assert!(matches!(active.created_at, ActiveValue::Set(t) if t == now));
        assert!(matches!(active.short_code, ActiveValue::Set(ref c) if c == "xyz"));
    }
}
