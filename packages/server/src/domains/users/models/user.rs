use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::common::{MembershipCounts, MembershipFilter, ProfileBlob, UserId};

/// User model - SQL persistence layer
///
/// `display_name` and `handle` are denormalized copies of the messaging
/// profile. `is_member` is only changed by reconciliation-adjacent paths
/// (interactive touch, roster refresh); `provisioned_profile` only by an
/// explicit grant or a revocation.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: UserId,
    pub display_name: String,
    pub handle: Option<String>,
    pub is_member: bool,
    pub provisioned_profile: Option<ProfileBlob>,
    pub is_privileged: bool,
    pub registered_at: DateTime<Utc>,
}

/// Fields needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: UserId,
    pub display_name: String,
    pub handle: Option<String>,
    pub is_member: bool,
    pub is_privileged: bool,
}

impl NewUser {
    pub fn into_user(self, registered_at: DateTime<Utc>) -> User {
        User {
            user_id: self.user_id,
            display_name: self.display_name,
            handle: self.handle,
            is_member: self.is_member,
            provisioned_profile: None,
            is_privileged: self.is_privileged,
            registered_at,
        }
    }
}

/// A partial update: only `Some` fields are written.
///
/// `handle` is doubly optional because clearing a handle is a real change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub display_name: Option<String>,
    pub handle: Option<Option<String>>,
    pub is_member: Option<bool>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.handle.is_none() && self.is_member.is_none()
    }

    /// Names of the fields this update touches, for logging.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.display_name.is_some() {
            names.push("display_name");
        }
        if self.handle.is_some() {
            names.push("handle");
        }
        if self.is_member.is_some() {
            names.push("is_member");
        }
        names
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(display_name) = &self.display_name {
            user.display_name = display_name.clone();
        }
        if let Some(handle) = &self.handle {
            user.handle = handle.clone();
        }
        if let Some(is_member) = self.is_member {
            user.is_member = is_member;
        }
    }
}

impl User {
    /// Find user by external identity
    pub async fn find_by_id(user_id: UserId, pool: &SqlitePool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Find all users passing the membership filter, in registration order
    pub async fn find_all(filter: MembershipFilter, pool: &SqlitePool) -> Result<Vec<Self>> {
        let query = match filter {
            MembershipFilter::All => "SELECT * FROM users ORDER BY registered_at, user_id",
            MembershipFilter::Members => {
                "SELECT * FROM users WHERE is_member = TRUE ORDER BY registered_at, user_id"
            }
            MembershipFilter::NonMembers => {
                "SELECT * FROM users WHERE is_member = FALSE ORDER BY registered_at, user_id"
            }
        };

        sqlx::query_as::<_, Self>(query)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Insert new user
    pub async fn insert(new_user: &NewUser, pool: &SqlitePool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (
                user_id,
                display_name,
                handle,
                is_member,
                is_privileged,
                registered_at
             )
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING *",
        )
        .bind(new_user.user_id)
        .bind(&new_user.display_name)
        .bind(&new_user.handle)
        .bind(new_user.is_member)
        .bind(new_user.is_privileged)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Write only the fields present in `changes`
    pub async fn update_fields(
        user_id: UserId,
        changes: &UserChanges,
        pool: &SqlitePool,
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let (set_handle, handle) = match &changes.handle {
            Some(handle) => (true, handle.clone()),
            None => (false, None),
        };

        sqlx::query(
            "UPDATE users
             SET display_name = COALESCE(?2, display_name),
                 handle = CASE WHEN ?3 THEN ?4 ELSE handle END,
                 is_member = COALESCE(?5, is_member)
             WHERE user_id = ?1",
        )
        .bind(user_id)
        .bind(&changes.display_name)
        .bind(set_handle)
        .bind(handle)
        .bind(changes.is_member)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn set_provisioned_profile(
        user_id: UserId,
        profile: &ProfileBlob,
        pool: &SqlitePool,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET provisioned_profile = ?2 WHERE user_id = ?1")
            .bind(user_id)
            .bind(profile)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn clear_provisioned_profile(user_id: UserId, pool: &SqlitePool) -> Result<()> {
        sqlx::query("UPDATE users SET provisioned_profile = NULL WHERE user_id = ?1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Make exactly `admins` privileged, creating placeholder rows for admins
    /// that never registered.
    pub async fn sync_privileged(admins: &[UserId], pool: &SqlitePool) -> Result<()> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE users SET is_privileged = FALSE")
            .execute(&mut *tx)
            .await?;

        for admin in admins {
            sqlx::query(
                "INSERT INTO users (user_id, display_name, is_member, is_privileged, registered_at)
                 VALUES (?1, ?2, FALSE, TRUE, ?3)
                 ON CONFLICT (user_id) DO UPDATE SET is_privileged = TRUE",
            )
            .bind(*admin)
            .bind(format!("Admin {}", admin))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn membership_counts(pool: &SqlitePool) -> Result<MembershipCounts> {
        let (total, members): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN is_member THEN 1 ELSE 0 END), 0)
             FROM users",
        )
        .fetch_one(pool)
        .await?;

        let total = total.max(0) as u64;
        let members = members.max(0) as u64;
        Ok(MembershipCounts {
            total,
            members,
            non_members: total.saturating_sub(members),
        })
    }
}
