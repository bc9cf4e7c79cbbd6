use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::common::StaticProfileId;
use crate::kernel::ServerDeps;

use super::models::StaticProfile;

/// Provision a profile under `name` and store its descriptor.
pub async fn create_static_profile(
    deps: &ServerDeps,
    pool: &SqlitePool,
    name: &str,
) -> Result<StaticProfile> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("static profile name must not be empty");
    }
    if StaticProfile::find_by_name(name, pool).await?.is_some() {
        anyhow::bail!("static profile '{}' already exists", name);
    }

    let descriptor = deps
        .provisioner
        .create(name)
        .await
        .with_context(|| format!("failed to create static profile '{}'", name))?;

    let profile = StaticProfile::insert(name, &descriptor, pool).await?;
    info!(id = profile.id, name = %profile.name, "static profile created");
    Ok(profile)
}

pub async fn list_static_profiles(pool: &SqlitePool) -> Result<Vec<StaticProfile>> {
    StaticProfile::find_all(pool).await
}

/// Remove a static profile from the provisioner and the store.
///
/// The row goes even when the provisioner refuses or fails; the resource is
/// then left for manual cleanup. Returns `false` when no such profile exists.
pub async fn delete_static_profile(
    deps: &ServerDeps,
    pool: &SqlitePool,
    id: StaticProfileId,
) -> Result<bool> {
    let Some(profile) = StaticProfile::find_by_id(id, pool).await? else {
        return Ok(false);
    };

    match profile.access_descriptor.resource_key() {
        Ok(key) => match deps.provisioner.delete_by_key(&key).await {
            Ok(true) => {}
            Ok(false) => warn!(id, name = %profile.name, "provisioner refused to delete static profile"),
            Err(e) => warn!(id, name = %profile.name, error = %e, "failed to delete static profile from provisioner"),
        },
        Err(e) => warn!(id, name = %profile.name, error = %e, "static profile has malformed descriptor"),
    }

    let removed = StaticProfile::delete(id, pool).await?;
    info!(id, name = %profile.name, "static profile deleted");
    Ok(removed)
}
