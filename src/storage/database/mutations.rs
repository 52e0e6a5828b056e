//! Write operations for DatabaseStorage
//!
//! Uniqueness is enforced by the primary key on `short_code`; a unique
//! violation reported by the driver becomes `ShortenerError::Conflict`.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, SqlErr, TransactionTrait};
use tracing::{debug, info};

use super::DatabaseStorage;
use super::converters::pair_to_active_model;
use crate::errors::{Result, ShortenerError};
use crate::storage::{DeletionRequest, UrlPair};

use migration::entities::url_pair;

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl DatabaseStorage {
    pub(super) async fn insert_pair(&self, pair: UrlPair) -> Result<()> {
        let active_model = pair_to_active_model(&pair, Utc::now());

        match url_pair::Entity::insert(active_model).exec(&self.db).await {
            Ok(_) => {
                debug!(parent: &self.span, "Short link created: {}", pair.short_code);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(ShortenerError::conflict(pair.short_code)),
            Err(e) => Err(ShortenerError::database_operation(format!(
                "插入短链接 '{}' 失败: {}",
                pair.short_code, e
            ))),
        }
    }

    /// 批量插入（单事务，全部成功或全部回滚）
    pub(super) async fn insert_pairs(&self, pairs: Vec<UrlPair>) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(pairs.len());
        if let Some(dup) = pairs.iter().find(|p| !seen.insert(p.short_code.as_str())) {
            return Err(ShortenerError::conflict(dup.short_code.clone()));
        }

        let now = Utc::now();
        let active_models: Vec<url_pair::ActiveModel> = pairs
            .iter()
            .map(|pair| pair_to_active_model(pair, now))
            .collect();

        let txn = self.db.begin().await.map_err(|e| {
            ShortenerError::database_operation(format!("开始事务失败: {}", e))
        })?;

        if let Err(e) = url_pair::Entity::insert_many(active_models).exec(&txn).await {
            // txn 在 drop 时自动回滚
            drop(txn);
            if is_unique_violation(&e) {
                let codes: Vec<String> = pairs.into_iter().map(|p| p.short_code).collect();
                let short_code = self
                    .first_taken_code(&codes)
                    .await?
                    .unwrap_or_else(|| codes[0].clone());
                return Err(ShortenerError::conflict(short_code));
            }
            return Err(ShortenerError::database_operation(format!(
                "批量插入失败: {}",
                e
            )));
        }

        txn.commit()
            .await
            .map_err(|e| ShortenerError::database_operation(format!("提交事务失败: {}", e)))?;

        info!(parent: &self.span, "Batch inserted {} links", pairs.len());
        Ok(())
    }

    /// 软删除：每个短码一条 UPDATE，整批在同一事务里
    pub(super) async fn mark_deleted(&self, requests: Vec<DeletionRequest>) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await.map_err(|e| {
            ShortenerError::database_operation(format!("开始事务失败: {}", e))
        })?;

        let mut applied = 0u64;
        for request in &requests {
            let result = url_pair::Entity::update_many()
                .col_expr(url_pair::Column::Deleted, Expr::val(true))
                .filter(url_pair::Column::ShortCode.eq(request.short_code.as_str()))
                .filter(url_pair::Column::OwnerId.eq(request.owner_id.as_str()))
                .filter(url_pair::Column::Deleted.eq(false))
                .exec(&txn)
                .await
                .map_err(|e| {
                    ShortenerError::database_operation(format!(
                        "软删除短链接 '{}' 失败: {}",
                        request.short_code, e
                    ))
                })?;
            applied += result.rows_affected;
        }

        txn.commit()
            .await
            .map_err(|e| ShortenerError::database_operation(format!("提交事务失败: {}", e)))?;

        debug!(
            parent: &self.span,
            "Soft-deleted {} of {} requested links",
            applied,
            requests.len()
        );
        Ok(())
    }
}
