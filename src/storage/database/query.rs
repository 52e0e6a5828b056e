//! Read-only operations for DatabaseStorage

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::debug;

use super::DatabaseStorage;
use super::converters::model_to_pair;
use crate::errors::{Result, ShortenerError};
use crate::storage::UrlPair;

use migration::entities::url_pair;

impl DatabaseStorage {
    pub(super) async fn find_pair(&self, short_code: &str) -> Result<UrlPair> {
        let model = url_pair::Entity::find_by_id(short_code.to_owned())
            .one(&self.db)
            .await
            .map_err(|e| ShortenerError::database_operation(format!("查询短链接失败: {}", e)))?;

        match model {
            Some(model) if model.deleted => Err(ShortenerError::deleted(format!(
                "short code '{}' has been deleted",
                short_code
            ))),
            Some(model) => Ok(model_to_pair(model)),
            None => Err(ShortenerError::not_exist(format!(
                "short code '{}' not found",
                short_code
            ))),
        }
    }

    pub(super) async fn find_pairs_by_owner(&self, owner_id: &str) -> Result<Vec<UrlPair>> {
        let models = url_pair::Entity::find()
            .filter(url_pair::Column::OwnerId.eq(owner_id))
            .filter(url_pair::Column::Deleted.eq(false))
            .order_by_asc(url_pair::Column::ShortCode)
            .all(&self.db)
            .await
            .map_err(|e| {
                ShortenerError::database_operation(format!("查询用户短链接失败: {}", e))
            })?;

        if models.is_empty() {
            return Err(ShortenerError::not_exist(format!(
                "user '{}' has no links",
                owner_id
            )));
        }

        debug!(parent: &self.span, "Loaded {} links for user {}", models.len(), owner_id);
        Ok(models.into_iter().map(model_to_pair).collect())
    }

    /// 返回给定短码中第一个已存在于表里的（用于定位批量插入的冲突）
    pub(super) async fn first_taken_code(&self, codes: &[String]) -> Result<Option<String>> {
        let taken: Vec<String> = url_pair::Entity::find()
            .filter(url_pair::Column::ShortCode.is_in(codes.iter().cloned()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.short_code)
            .collect();

        Ok(codes.iter().find(|c| taken.contains(c)).cloned())
    }
}
