use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::common::{ProfileBlob, StaticProfileId};

/// StaticProfile model - SQL persistence layer
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct StaticProfile {
    pub id: StaticProfileId,
    pub name: String,
    pub access_descriptor: ProfileBlob,
    pub created_at: DateTime<Utc>,
}

impl StaticProfile {
    pub async fn find_by_id(id: StaticProfileId, pool: &SqlitePool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM static_profiles WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_name(name: &str, pool: &SqlitePool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM static_profiles WHERE name = ?1")
            .bind(name)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find all static profiles, oldest first
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM static_profiles ORDER BY id")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn insert(
        name: &str,
        access_descriptor: &ProfileBlob,
        pool: &SqlitePool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO static_profiles (name, access_descriptor, created_at)
             VALUES (?1, ?2, ?3)
             RETURNING *",
        )
        .bind(name)
        .bind(access_descriptor)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Delete by id, returning whether a row was removed
    pub async fn delete(id: StaticProfileId, pool: &SqlitePool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM static_profiles WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
