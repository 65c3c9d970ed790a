// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::tag_store::{ImageTag, TagCount, TagStore, TagStoreError};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;

/// SQLite 标签索引实现
#[derive(Clone)]
pub struct SqliteTagStore {
    pool: SqlitePool,
}

impl SqliteTagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagStore for SqliteTagStore {
    async fn tags_for_files(
        &self,
        filepaths: &[String],
    ) -> Result<HashMap<String, Vec<ImageTag>>, TagStoreError> {
        let mut result: HashMap<String, Vec<ImageTag>> = filepaths
            .iter()
            .map(|path| (path.clone(), Vec::new()))
            .collect();
        if filepaths.is_empty() {
            return Ok(result);
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT filepath, tag, confidence FROM image_tags WHERE filepath IN (");
        let mut separated = builder.separated(", ");
        for path in filepaths {
            separated.push_bind(path);
        }
        separated.push_unseparated(") ORDER BY confidence DESC, tag ASC");

        let rows: Vec<(String, String, Option<f64>)> =
            builder.build_query_as().fetch_all(&self.pool).await?;
        for (filepath, tag, confidence) in rows {
            result.entry(filepath).or_default().push(ImageTag {
                tag,
                confidence: confidence.unwrap_or(0.0),
            });
        }
        Ok(result)
    }

    async fn tag_counts(&self) -> Result<Vec<TagCount>, TagStoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT tag, COUNT(id) AS tag_count FROM image_tags GROUP BY tag ORDER BY tag_count DESC, tag ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect())
    }

    async fn delete_tag(&self, tag: &str) -> Result<u64, TagStoreError> {
        let result = sqlx::query("DELETE FROM image_tags WHERE tag = ?")
            .bind(tag)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_tags_for_file(&self, filepath: &str) -> Result<u64, TagStoreError> {
        let result = sqlx::query("DELETE FROM image_tags WHERE filepath = ?")
            .bind(filepath)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_tags_for_user(&self, username: &str) -> Result<u64, TagStoreError> {
        let result = sqlx::query("DELETE FROM image_tags WHERE filepath LIKE ? ESCAPE '\\'")
            .bind(format!("{}/%", escape_like(username)))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
